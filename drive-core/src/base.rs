//! Core functionalities.
mod agent;
mod env;
mod policy;
mod replay_buffer;
mod step;
pub use agent::Agent;
pub use env::Env;
pub use policy::{Configurable, Policy};
pub use replay_buffer::{ExperienceBufferBase, ReplayBufferBase};
use std::fmt::Debug;
pub use step::{Info, Step};

/// An observation of an environment.
///
/// Observations are cloned into transitions and replay memory, so
/// implementations holding large payloads (camera frames) should make
/// cloning cheap, e.g. by sharing the payload behind an `Arc`.
pub trait Obs: Clone + Debug {}

/// An action of an environment.
pub trait Act: Clone + Debug {}

/// An action drawn from a finite set, identified by its index.
pub trait DiscreteAct: Act {
    /// Number of distinct actions.
    fn n_actions() -> usize;

    /// Returns the action with the given index, or `None` if out of range.
    fn from_index(ix: usize) -> Option<Self>;

    /// Index of this action in `0..n_actions()`.
    fn index(&self) -> usize;
}
