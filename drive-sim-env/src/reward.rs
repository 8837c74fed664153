//! Reward and termination of the lane-driving task.
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reward and termination given by [`RewardPolicy::evaluate`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Outcome {
    pub reward: f32,

    /// The episode ended because of a collision.
    pub is_terminated: bool,

    /// The episode ran out of time.
    pub is_truncated: bool,
}

impl Outcome {
    pub fn is_done(&self) -> bool {
        self.is_terminated || self.is_truncated
    }
}

/// Rewards driving above a minimum speed and punishes collisions.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct RewardPolicy {
    pub collision_reward: f32,
    pub slow_reward: f32,
    pub cruise_reward: f32,

    /// Below this speed [`RewardPolicy::slow_reward`] is given.
    pub min_speed_kmh: u32,

    /// Time budget of an episode.
    pub seconds_per_episode: f32,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            collision_reward: -200.0,
            slow_reward: -1.0,
            cruise_reward: 1.0,
            min_speed_kmh: 50,
            seconds_per_episode: 10.0,
        }
    }
}

impl RewardPolicy {
    pub fn seconds_per_episode(mut self, secs: f32) -> Self {
        self.seconds_per_episode = secs;
        self
    }

    pub fn min_speed_kmh(mut self, kmh: u32) -> Self {
        self.min_speed_kmh = kmh;
        self
    }

    pub fn evaluate(&self, collided: bool, speed_kmh: u32, elapsed: Duration) -> Outcome {
        let (reward, is_terminated) = if collided {
            (self.collision_reward, true)
        } else if speed_kmh < self.min_speed_kmh {
            (self.slow_reward, false)
        } else {
            (self.cruise_reward, false)
        };
        let is_truncated = !is_terminated && elapsed.as_secs_f32() > self.seconds_per_episode;

        Outcome {
            reward,
            is_terminated,
            is_truncated,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_reward_table() {
        let policy = RewardPolicy::default();
        let t = Duration::from_secs(1);

        let o = policy.evaluate(true, 80, t);
        assert_eq!(o.reward, -200.0);
        assert!(o.is_terminated && o.is_done());

        let o = policy.evaluate(false, 49, t);
        assert_eq!(o.reward, -1.0);
        assert!(!o.is_done());

        let o = policy.evaluate(false, 50, t);
        assert_eq!(o.reward, 1.0);
        assert!(!o.is_done());

        let o = policy.evaluate(false, 0, t);
        assert_eq!(o.reward, -1.0);
    }

    #[test]
    fn test_time_budget() {
        let policy = RewardPolicy::default();

        let o = policy.evaluate(false, 60, Duration::from_secs(10));
        assert!(!o.is_done());

        let o = policy.evaluate(false, 60, Duration::from_millis(10_001));
        assert_eq!(o.reward, 1.0);
        assert!(o.is_truncated && o.is_done());

        let o = policy.evaluate(false, 10, Duration::from_secs(11));
        assert_eq!(o.reward, -1.0);
        assert!(o.is_done());

        // A collision takes precedence.
        let o = policy.evaluate(true, 10, Duration::from_secs(11));
        assert!(o.is_terminated && !o.is_truncated);
    }
}
