//! Lane-driving environment on a driving simulator.
//!
//! [`CarEnv`] spawns a car with a front camera and a collision sensor into a
//! simulator [`World`], steers it with [`SteerAct`] and rewards it with a
//! [`RewardPolicy`]. Sensor output arrives through callbacks on a simulator
//! thread and is handed to the control loop through a [`FrameSlot`] and a
//! [`CollisionLog`].
//!
//! The [`sandbox`] module provides a small in-process simulator
//! implementing the [`Client`] and [`World`] traits.
mod act;
mod capture;
mod client;
mod env;
mod error;
mod lookup;
mod mailbox;
mod obs;
mod reward;
pub mod sandbox;
mod types;
pub use act::SteerAct;
pub use capture::{CameraRig, CameraRigConfig};
pub use client::{Client, ClientConfig, SensorCallback, World};
pub use env::{CameraConfig, CarEnv, CarEnvConfig};
pub use error::SimError;
pub use lookup::{find_actor, ActorSelector};
pub use mailbox::{CollisionLog, FrameSlot, Mailbox};
pub use obs::CameraObs;
pub use reward::{Outcome, RewardPolicy};
pub use types::{
    match_type_id, ActorId, ActorSnapshot, Blueprint, CollisionEvent, Location, RawImage,
    Rotation, SensorData, Transform, Vector3D, VehicleControl,
};
