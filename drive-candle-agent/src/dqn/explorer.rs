//! Exploration strategy of DQN.
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Epsilon-greedy explorer with per-episode exponential decay.
///
/// The exploration rate after `n_episodes` finished episodes is
/// `max(eps_final, eps_start * eps_decay^n_episodes)`.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EpsilonGreedy {
    pub eps_start: f64,
    pub eps_decay: f64,
    pub eps_final: f64,

    /// Number of episodes the decay has been applied for.
    #[serde(default)]
    pub n_episodes: usize,
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self {
            eps_start: 1.0,
            eps_decay: 0.95,
            eps_final: 0.001,
            n_episodes: 0,
        }
    }
}

impl EpsilonGreedy {
    /// Current exploration rate.
    pub fn epsilon(&self) -> f64 {
        let e = self.n_episodes.min(i32::MAX as usize) as i32;
        (self.eps_start * self.eps_decay.powi(e)).max(self.eps_final)
    }

    /// Applies one decay step.
    pub fn on_episode_end(&mut self) {
        self.n_episodes += 1;
    }

    /// Returns `true` if the next action should be taken at random.
    pub fn explore(&self, rng: &mut impl Rng) -> bool {
        rng.gen::<f64>() < self.epsilon()
    }

    /// Set the epsilon value at the start.
    pub fn eps_start(mut self, v: f64) -> Self {
        self.eps_start = v;
        self
    }

    /// Set the decay factor applied at the end of each episode.
    pub fn eps_decay(mut self, v: f64) -> Self {
        self.eps_decay = v;
        self
    }

    /// Set the lower bound of epsilon.
    pub fn eps_final(mut self, v: f64) -> Self {
        self.eps_final = v;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn test_epsilon_decay() {
        let mut explorer = EpsilonGreedy::default();
        assert_eq!(explorer.epsilon(), 1.0);

        for e in 1..300 {
            explorer.on_episode_end();
            let expected = (0.95f64.powi(e)).max(0.001);
            assert!((explorer.epsilon() - expected).abs() < 1e-12, "episode {}", e);
        }
        assert_eq!(explorer.epsilon(), 0.001);
    }

    #[test]
    fn test_explore_extremes() {
        let mut rng = SmallRng::seed_from_u64(0);
        let always = EpsilonGreedy::default();
        assert!((0..100).all(|_| always.explore(&mut rng)));

        let never = EpsilonGreedy::default().eps_start(0.0).eps_final(0.0);
        assert!((0..100).all(|_| !never.explore(&mut rng)));
    }
}
