#![warn(missing_docs)]
//! Core abstractions for training a driving agent with deep Q-learning.
//!
//! This crate defines the seams between the environment adapter
//! ([`Env`]), the learner ([`Agent`]) and the experience storage
//! ([`ReplayBufferBase`], [`ExperienceBufferBase`]). It does not depend on
//! any simulator or neural network library.
pub mod dummy;
pub mod error;
pub mod record;
pub mod replay_buffer;

mod base;
pub use base::{
    Act, Agent, Configurable, DiscreteAct, Env, ExperienceBufferBase, Info, Obs, Policy, ReplayBufferBase,
    Step,
};
