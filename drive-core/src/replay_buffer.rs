//! Replay memory of transitions.
mod base;
mod batch;
mod config;
pub use base::ReplayMemory;
pub use batch::{Transition, TransitionBatch};
pub use config::ReplayMemoryConfig;
