//! A small in-process driving simulator.
//!
//! The map is a ring road with parked cars as obstacles. Vehicles follow a
//! kinematic bicycle model, cameras render a top-down view of the ground
//! around them and collision sensors fire while their vehicle touches the
//! road boundary, an obstacle or another vehicle. It implements [`Client`]
//! and [`World`] so that [`CarEnv`](crate::CarEnv) and the training loop
//! can run without an external simulator.
mod config;
mod render;
mod world;
use crate::Client;
use anyhow::Result;
pub use config::{Obstacle, SandboxConfig, VehiclePhysics};
pub use world::SandboxWorld;

/// Client of the sandbox simulator.
///
/// Connecting creates a new world; all handles obtained by
/// [`Client::world`] refer to it.
pub struct SandboxClient {
    world: SandboxWorld,
}

impl Client for SandboxClient {
    type Config = SandboxConfig;
    type World = SandboxWorld;

    fn connect(config: &SandboxConfig) -> Result<Self> {
        log::info!(
            "Starting sandbox simulator for {}:{} (in-process)",
            config.host,
            config.port
        );
        Ok(Self {
            world: SandboxWorld::new(config.clone())?,
        })
    }

    fn world(&self) -> Result<SandboxWorld> {
        Ok(self.world.clone())
    }
}
