//! Environment step.
use super::Env;

/// Additional information to `Obs` and `Act`.
pub trait Info {}

impl Info for () {}

/// Outcome of applying action `a_t`: the next observation `o_t+1` and the
/// reward `r_t`.
///
/// The acting loop pairs it with `o_t` to form a
/// [`Transition`](crate::replay_buffer::Transition).
pub struct Step<E: Env> {
    /// The applied action.
    pub act: E::Act,

    /// Observation after the action.
    pub obs: E::Obs,

    /// Reward of the action.
    pub reward: f32,

    /// The episode reached a terminal state, e.g. a collision.
    pub is_terminated: bool,

    /// The episode was cut short, e.g. by its time budget.
    pub is_truncated: bool,

    /// Information defined by the environment.
    pub info: E::Info,
}

impl<E: Env> Step<E> {
    /// Constructs a [`Step`] object.
    pub fn new(
        obs: E::Obs,
        act: E::Act,
        reward: f32,
        is_terminated: bool,
        is_truncated: bool,
        info: E::Info,
    ) -> Self {
        Step {
            act,
            obs,
            reward,
            is_terminated,
            is_truncated,
            info,
        }
    }

    /// Terminated or truncated.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.is_terminated || self.is_truncated
    }
}
