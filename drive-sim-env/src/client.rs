//! Interface of a driving simulator.
//!
//! A [`Client`] connects to a simulator server and hands out a [`World`],
//! through which actors are spawned, controlled and destroyed. Sensor
//! output is delivered asynchronously to callbacks registered with
//! [`World::listen`], possibly on a thread owned by the simulator.
use crate::types::{
    ActorId, ActorSnapshot, Blueprint, SensorData, Transform, Vector3D, VehicleControl,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Callback receiving sensor output.
pub type SensorCallback = Box<dyn FnMut(SensorData) + Send + 'static>;

/// Network address of a simulator server.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,

    /// Timeout of requests to the server in seconds.
    pub timeout_secs: f32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 2000,
            timeout_secs: 2.0,
        }
    }
}

impl ClientConfig {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: f32) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Connection to a simulator.
pub trait Client: Sized {
    /// Configuration of the connection.
    type Config: Clone;

    /// The world this client operates on.
    type World: World;

    /// Connects to the simulator.
    fn connect(config: &Self::Config) -> Result<Self>;

    /// Returns a handle to the current world.
    fn world(&self) -> Result<Self::World>;
}

/// Operations on a simulated world.
pub trait World {
    /// Returns the blueprint with the given id.
    fn find_blueprint(&self, id: &str) -> Result<Blueprint>;

    /// Returns blueprints whose id matches `pattern`, see
    /// [`Blueprint::matches`].
    fn filter_blueprints(&self, pattern: &str) -> Vec<Blueprint>;

    /// Recommended spawn points of vehicles on the map.
    fn spawn_points(&self) -> Vec<Transform>;

    /// Spawns an actor.
    ///
    /// If `attach_to` is given, `transform` is relative to that actor and
    /// the new actor follows it. Fails with
    /// [`SimError::SpawnCollision`](crate::SimError::SpawnCollision) when
    /// the location is occupied.
    fn spawn_actor(
        &mut self,
        blueprint: &Blueprint,
        transform: &Transform,
        attach_to: Option<ActorId>,
    ) -> Result<ActorId>;

    fn apply_control(&mut self, vehicle: ActorId, control: &VehicleControl) -> Result<()>;

    /// Velocity of an actor in world coordinates.
    fn velocity(&self, actor: ActorId) -> Result<Vector3D>;

    /// Transform of an actor in world coordinates.
    fn transform(&self, actor: ActorId) -> Result<Transform>;

    fn destroy_actor(&mut self, actor: ActorId) -> Result<()>;

    /// Registers the callback receiving the output of a sensor.
    ///
    /// Replaces a previously registered callback.
    fn listen(&mut self, sensor: ActorId, callback: SensorCallback) -> Result<()>;

    /// Snapshot of all actors in the world.
    fn actors(&self) -> Vec<ActorSnapshot>;

    /// Transform of the spectator, the free camera of the simulator's viewer.
    fn spectator_transform(&self) -> Result<Transform>;

    /// Advances a world running in synchronous mode by one step and returns
    /// the frame number. An asynchronous world just returns the current frame.
    fn tick(&mut self) -> Result<u64>;
}
