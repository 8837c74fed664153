//! Replay buffer interface.
//!
//! Storing experiences and generating batches are split into two traits,
//! so that a sampling loop only needs [`ExperienceBufferBase`] while an
//! [`Agent`](crate::Agent) only needs [`ReplayBufferBase`].
use anyhow::Result;

/// Interface for buffers that store experiences from environments.
pub trait ExperienceBufferBase {
    /// The type of items stored in the buffer.
    type Item;

    /// Pushes a new experience into the buffer.
    fn push(&mut self, tr: Self::Item) -> Result<()>;

    /// Returns the current number of experiences in the buffer.
    fn len(&self) -> usize;

    /// Returns `true` if the buffer holds no experience.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interface for replay buffers that generate batches for training.
pub trait ReplayBufferBase {
    /// Configuration parameters for the replay buffer.
    type Config: Clone;

    /// The type of batch generated for training.
    type Batch;

    /// Builds a new replay buffer from the given configuration.
    fn build(config: &Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Number of transitions available for sampling.
    fn len(&self) -> usize;

    /// Samples a batch of experiences for training.
    ///
    /// The batch may be smaller than `size` when fewer experiences are
    /// stored.
    fn batch(&mut self, size: usize) -> Result<Self::Batch>;
}
