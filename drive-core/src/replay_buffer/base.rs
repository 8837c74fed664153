//! Bounded FIFO replay memory.
use super::{ReplayMemoryConfig, Transition, TransitionBatch};
use crate::{error::CoreError, ExperienceBufferBase, ReplayBufferBase};
use anyhow::Result;
use log::trace;
use rand::{rngs::StdRng, seq::index, SeedableRng};
use std::collections::VecDeque;

/// A replay memory with a fixed capacity.
///
/// Pushing into a full memory evicts the oldest transition. Batches are
/// drawn uniformly at random without replacement.
pub struct ReplayMemory<O, A> {
    capacity: usize,
    transitions: VecDeque<Transition<O, A>>,
    rng: StdRng,
}

impl<O, A> ReplayMemory<O, A> {
    /// Creates an empty memory.
    pub fn new(config: &ReplayMemoryConfig) -> Result<Self> {
        if config.capacity == 0 {
            return Err(CoreError::InvalidCapacity(config.capacity).into());
        }

        Ok(Self {
            capacity: config.capacity,
            transitions: VecDeque::with_capacity(config.capacity),
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    /// Capacity of the memory.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored transitions.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Returns `true` if no transition is stored.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Iterates over the stored transitions, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Transition<O, A>> {
        self.transitions.iter()
    }

    /// Appends a transition, dropping the oldest one when full.
    pub fn append(&mut self, tr: Transition<O, A>) {
        if self.transitions.len() == self.capacity {
            self.transitions.pop_front();
        }
        self.transitions.push_back(tr);
    }
}

impl<O, A> ReplayMemory<O, A>
where
    O: Clone,
    A: Clone,
{
    /// Samples `min(size, len)` distinct transitions.
    pub fn sample(&mut self, size: usize) -> Result<TransitionBatch<O, A>> {
        if self.transitions.is_empty() {
            return Err(CoreError::EmptyReplayMemory.into());
        }

        let n = size.min(self.transitions.len());
        let ixs = index::sample(&mut self.rng, self.transitions.len(), n);
        let mut batch = TransitionBatch::with_capacity(n);
        for ix in ixs.iter() {
            batch.push(ix, &self.transitions[ix]);
        }
        trace!("Sampled {} transitions from {}", n, self.transitions.len());

        Ok(batch)
    }
}

impl<O, A> ExperienceBufferBase for ReplayMemory<O, A> {
    type Item = Transition<O, A>;

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        self.append(tr);
        Ok(())
    }

    fn len(&self) -> usize {
        self.transitions.len()
    }
}

impl<O, A> ReplayBufferBase for ReplayMemory<O, A>
where
    O: Clone,
    A: Clone,
{
    type Config = ReplayMemoryConfig;
    type Batch = TransitionBatch<O, A>;

    fn build(config: &Self::Config) -> Result<Self> {
        Self::new(config)
    }

    fn len(&self) -> usize {
        self.transitions.len()
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        self.sample(size)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    fn memory(capacity: usize) -> ReplayMemory<usize, usize> {
        ReplayMemory::new(&ReplayMemoryConfig::default().capacity(capacity)).unwrap()
    }

    fn tr(i: usize) -> Transition<usize, usize> {
        Transition::new(i, i % 3, i as f32, i + 1, false)
    }

    #[test]
    fn test_keeps_latest_transitions_in_order() {
        let capacity = 7;
        for k in 1..20 {
            let mut m = memory(capacity);
            for i in 0..capacity + k {
                m.append(tr(i));
            }
            assert_eq!(m.len(), capacity);
            let kept: Vec<usize> = m.iter().map(|t| t.obs).collect();
            let expected: Vec<usize> = (k..capacity + k).collect();
            assert_eq!(kept, expected);
        }
    }

    #[test]
    fn test_sample_without_replacement() {
        let mut m = memory(100);
        for i in 0..50 {
            m.append(tr(i));
        }
        for _ in 0..20 {
            let batch = m.sample(16).unwrap();
            assert_eq!(batch.len(), 16);
            let distinct: HashSet<usize> = batch.obs.iter().cloned().collect();
            assert_eq!(distinct.len(), 16);
            for (ix, obs) in batch.ix_sample.iter().zip(batch.obs.iter()) {
                assert_eq!(ix, obs);
            }
        }
    }

    #[test]
    fn test_sample_is_capped_by_len() {
        let mut m = memory(5);
        for i in 0..3 {
            m.append(tr(i));
        }
        let batch = m.sample(16).unwrap();
        let mut obs = batch.obs.clone();
        obs.sort();
        assert_eq!(obs, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_memory_fails_to_sample() {
        let mut m = memory(5);
        let err = m.sample(4).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::EmptyReplayMemory)
        ));
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let config = ReplayMemoryConfig::default().capacity(0);
        assert!(ReplayMemory::<usize, usize>::new(&config).is_err());
    }

    #[test]
    fn test_config_roundtrip_through_yaml() -> Result<()> {
        let dir = tempdir::TempDir::new("replay_memory_config")?;
        let path = dir.path().join("memory.yaml");
        let config = ReplayMemoryConfig::default().capacity(123).seed(7);
        config.save(&path)?;
        assert_eq!(ReplayMemoryConfig::load(&path)?, config);
        Ok(())
    }
}
