//! Transitions and batches of transitions.

/// A transition `(o_t, a_t, r_t, o_t+1, done_t)`.
///
/// Transitions are never modified after construction.
#[derive(Clone, Debug)]
pub struct Transition<O, A> {
    /// Observation `o_t`.
    pub obs: O,

    /// Action `a_t`.
    pub act: A,

    /// Reward `r_t`.
    pub reward: f32,

    /// Observation `o_t+1`.
    pub next_obs: O,

    /// `true` if the episode ended with this transition.
    pub is_done: bool,
}

impl<O, A> Transition<O, A> {
    /// Constructs a transition.
    pub fn new(obs: O, act: A, reward: f32, next_obs: O, is_done: bool) -> Self {
        Self {
            obs,
            act,
            reward,
            next_obs,
            is_done,
        }
    }
}

/// A minibatch of transitions in columnar layout.
#[derive(Debug)]
pub struct TransitionBatch<O, A> {
    /// Observations.
    pub obs: Vec<O>,

    /// Actions.
    pub act: Vec<A>,

    /// Next observations.
    pub next_obs: Vec<O>,

    /// Rewards.
    pub reward: Vec<f32>,

    /// Done flags.
    pub is_done: Vec<bool>,

    /// Positions of the sampled transitions in the replay memory,
    /// oldest-first indexing.
    pub ix_sample: Vec<usize>,
}

impl<O, A> TransitionBatch<O, A> {
    /// Creates an empty batch with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            obs: Vec::with_capacity(capacity),
            act: Vec::with_capacity(capacity),
            next_obs: Vec::with_capacity(capacity),
            reward: Vec::with_capacity(capacity),
            is_done: Vec::with_capacity(capacity),
            ix_sample: Vec::with_capacity(capacity),
        }
    }

    /// Appends a transition found at position `ix` of the memory.
    pub fn push(&mut self, ix: usize, tr: &Transition<O, A>)
    where
        O: Clone,
        A: Clone,
    {
        self.obs.push(tr.obs.clone());
        self.act.push(tr.act.clone());
        self.next_obs.push(tr.next_obs.clone());
        self.reward.push(tr.reward);
        self.is_done.push(tr.is_done);
        self.ix_sample.push(ix);
    }

    /// Unpack the data `(o_t, a_t, o_t+1, r_t, done_t)`.
    pub fn unpack(self) -> (Vec<O>, Vec<A>, Vec<O>, Vec<f32>, Vec<bool>) {
        (self.obs, self.act, self.next_obs, self.reward, self.is_done)
    }

    /// Returns the number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.reward.len()
    }

    /// Returns `true` if the batch has no transition.
    pub fn is_empty(&self) -> bool {
        self.reward.is_empty()
    }
}
