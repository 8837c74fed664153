//! Environment.
use super::{Act, Info, Obs, Step};
use crate::record::Record;
use anyhow::Result;

/// An episodic environment the agent acts in.
pub trait Env {
    /// Configuration, typically loaded from YAML.
    type Config: Clone;
    #[allow(missing_docs)]
    type Obs: Obs;
    #[allow(missing_docs)]
    type Act: Act;

    /// Extra information attached to each [`Step`].
    type Info: Info;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Applies an action and advances the environment by one step.
    ///
    /// The returned [`Record`] carries values the environment wants to
    /// expose for logging, such as the current speed.
    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)>
    where
        Self: Sized;

    /// Starts a new episode and returns the initial observation.
    fn reset(&mut self) -> Result<Self::Obs>;

    /// Resets the environment, retrying failures the environment considers
    /// transient at most `max_attempts` times in total.
    ///
    /// The default implementation calls [`Env::reset`] once.
    fn reset_with_retry(&mut self, _max_attempts: usize) -> Result<Self::Obs> {
        self.reset()
    }
}
