use std::{collections::VecDeque, time::Duration};

/// Stats of the sampling loop of [Actor](crate::Actor).
#[derive(Clone, Debug)]
pub struct ActorStat {
    /// The number of finished episodes.
    pub n_episodes: usize,

    /// The number of steps for interaction between agent and env.
    pub env_steps: usize,

    /// Duration of sampling loop.
    pub duration: Duration,
}

impl ActorStat {
    pub fn steps_per_sec(&self) -> f32 {
        self.env_steps as f32 / self.duration.as_secs_f32().max(f32::EPSILON)
    }

    /// Returns a formatted string.
    pub fn fmt(&self) -> String {
        let mut s = "episodes, samples, duration [sec], samples per sec\n".to_string();
        s += format!(
            "{}, {}, {}, {}\n",
            self.n_episodes,
            self.env_steps,
            self.duration.as_secs_f32(),
            self.steps_per_sec()
        )
        .as_str();
        s
    }
}

/// Rewards of the most recent episodes.
///
/// The window starts empty, so the first aggregation covers only the
/// episodes run so far. No placeholder reward is seeded.
#[derive(Clone, Debug)]
pub struct EpisodeWindow {
    size: usize,
    rewards: VecDeque<f32>,
}

impl EpisodeWindow {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            rewards: VecDeque::with_capacity(size),
        }
    }

    pub fn push(&mut self, reward: f32) {
        if self.rewards.len() == self.size {
            self.rewards.pop_front();
        }
        self.rewards.push_back(reward);
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    pub fn avg(&self) -> Option<f32> {
        match self.rewards.is_empty() {
            true => None,
            false => Some(self.rewards.iter().sum::<f32>() / self.rewards.len() as f32),
        }
    }

    pub fn min(&self) -> Option<f32> {
        self.rewards.iter().cloned().reduce(f32::min)
    }

    pub fn max(&self) -> Option<f32> {
        self.rewards.iter().cloned().reduce(f32::max)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_episode_window() {
        let mut w = EpisodeWindow::new(3);
        assert_eq!(w.avg(), None);
        assert_eq!(w.min(), None);

        w.push(-200.0);
        assert_eq!(w.avg(), Some(-200.0));

        for r in [10.0, 20.0, 30.0] {
            w.push(r);
        }
        assert_eq!(w.len(), 3);
        assert_eq!(w.avg(), Some(20.0));
        assert_eq!(w.min(), Some(10.0));
        assert_eq!(w.max(), Some(30.0));
    }

    #[test]
    fn test_first_aggregate_covers_only_run_episodes() {
        let mut w = EpisodeWindow::new(10);
        assert!(w.is_empty());
        w.push(5.0);
        assert_eq!(w.len(), 1);
        assert_eq!(w.min(), Some(5.0));
        assert_eq!(w.avg(), Some(5.0));
    }
}
