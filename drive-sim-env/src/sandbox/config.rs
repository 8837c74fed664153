//! Configuration of the sandbox simulator.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// A static round obstacle, such as a parked car.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct Obstacle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Kinematics of sandbox vehicles.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct VehiclePhysics {
    /// Acceleration at full throttle, m/s^2.
    pub max_accel: f32,

    /// Deceleration at full brake, m/s^2.
    pub max_brake: f32,

    /// Quadratic drag coefficient, 1/m.
    pub drag: f32,

    /// Steering angle at full steer, degrees.
    pub max_steer_deg: f32,
    pub wheelbase: f32,

    /// Radius of the disc used for collision checks.
    pub radius: f32,
}

impl Default for VehiclePhysics {
    fn default() -> Self {
        Self {
            max_accel: 5.0,
            max_brake: 9.0,
            drag: 0.004,
            max_steer_deg: 35.0,
            wheelbase: 2.9,
            radius: 2.0,
        }
    }
}

/// Configuration of [`SandboxClient`](super::SandboxClient).
///
/// The map is a ring road centered at the origin.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SandboxConfig {
    /// Accepted for compatibility with networked simulators; the sandbox
    /// runs in-process.
    pub host: String,
    pub port: u16,

    /// Advance only on [`World::tick`](crate::World::tick). Otherwise a
    /// server thread advances the world at `tick_hz` and delivers sensor
    /// data from that thread.
    pub synchronous: bool,
    pub tick_hz: f32,

    pub road_inner_radius: f32,
    pub road_outer_radius: f32,

    /// Number of spawn points evenly spaced on the center line.
    pub n_spawn_points: usize,

    /// Minimum distance between a spawned vehicle and other vehicles or
    /// obstacles.
    pub spawn_clearance: f32,
    pub obstacles: Vec<Obstacle>,

    /// Number of traffic lights placed along the outer edge of the road.
    pub n_traffic_lights: usize,

    /// Width of the ground area seen by a camera, meters.
    pub view_width_m: f32,
    pub physics: VehiclePhysics,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        let obstacles = [40.0f32, 160.0, 250.0]
            .iter()
            .map(|deg| {
                let (sin, cos) = deg.to_radians().sin_cos();
                Obstacle {
                    x: 49.0 * cos,
                    y: 49.0 * sin,
                    radius: 2.0,
                }
            })
            .collect();

        Self {
            host: "localhost".to_string(),
            port: 2000,
            synchronous: false,
            tick_hz: 20.0,
            road_inner_radius: 40.0,
            road_outer_radius: 52.0,
            n_spawn_points: 12,
            spawn_clearance: 6.0,
            obstacles,
            n_traffic_lights: 4,
            view_width_m: 40.0,
            physics: VehiclePhysics::default(),
        }
    }
}

impl SandboxConfig {
    pub fn synchronous(mut self, synchronous: bool) -> Self {
        self.synchronous = synchronous;
        self
    }

    pub fn tick_hz(mut self, tick_hz: f32) -> Self {
        self.tick_hz = tick_hz;
        self
    }

    pub fn obstacles(mut self, obstacles: Vec<Obstacle>) -> Self {
        self.obstacles = obstacles;
        self
    }

    pub fn n_spawn_points(mut self, n: usize) -> Self {
        self.n_spawn_points = n;
        self
    }

    /// Radius of the center line of the road.
    pub fn center_radius(&self) -> f32 {
        0.5 * (self.road_inner_radius + self.road_outer_radius)
    }

    /// Constructs [`SandboxConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`SandboxConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
