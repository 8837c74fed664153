//! Errors in the library.
use thiserror::Error;

/// Errors raised by the core types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// A batch was requested from a replay memory without transitions.
    #[error("Replay memory is empty")]
    EmptyReplayMemory,

    /// The replay memory was configured with zero capacity.
    #[error("Replay memory capacity must be positive, got {0}")]
    InvalidCapacity(usize),
}
