//! Errors in the simulator interface and the environment.
use crate::types::{ActorId, Location};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Failed to connect to {host}:{port}: {reason}")]
    ConnectionFailed {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("Blueprint not found: {0}")]
    BlueprintNotFound(String),

    #[error("Spawn failed because of a collision at {0:?}")]
    SpawnCollision(Location),

    #[error("Actor not found: {0:?}")]
    ActorNotFound(ActorId),

    #[error("Actor {0:?} is not a sensor")]
    NotASensor(ActorId),

    #[error("Actor {0:?} is not a vehicle")]
    NotAVehicle(ActorId),

    #[error("Invalid value {value:?} for attribute {key}")]
    InvalidAttribute { key: String, value: String },

    #[error("Invalid image: expected {expected} bytes, got {actual}")]
    InvalidImage { expected: usize, actual: usize },

    #[error("No camera frame arrived within {0:?}")]
    FrameTimeout(Duration),

    #[error("No spawn points available")]
    NoSpawnPoints,

    #[error("No running episode, call reset() first")]
    NoEpisode,
}
