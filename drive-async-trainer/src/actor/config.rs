use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Actor`](crate::Actor).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ActorConfig {
    /// Number of episodes to run.
    pub n_episodes: usize,

    /// Episode rewards are aggregated over windows of this many episodes.
    pub aggregate_stats_every: usize,

    /// A checkpoint is saved when the minimum reward of the window reaches this value.
    pub min_reward: f32,

    /// Prefix of checkpoint directories.
    pub model_name: String,

    /// Where checkpoints are saved. Checkpoints are disabled if `None`.
    pub model_dir: Option<String>,

    /// If set, the actor sleeps `1 / fps` seconds after a random action.
    pub fps: Option<f32>,

    /// Maximum number of attempts to reset the environment.
    pub max_reset_attempts: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            n_episodes: 100,
            aggregate_stats_every: 10,
            min_reward: -200.0,
            model_name: "cnn".to_string(),
            model_dir: None,
            fps: Some(20.0),
            max_reset_attempts: 10,
        }
    }
}

impl ActorConfig {
    /// Constructs [`ActorConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ActorConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    pub fn n_episodes(mut self, v: usize) -> Self {
        self.n_episodes = v;
        self
    }

    pub fn aggregate_stats_every(mut self, v: usize) -> Self {
        self.aggregate_stats_every = v;
        self
    }

    pub fn min_reward(mut self, v: f32) -> Self {
        self.min_reward = v;
        self
    }

    pub fn model_name(mut self, v: impl Into<String>) -> Self {
        self.model_name = v.into();
        self
    }

    pub fn model_dir(mut self, v: impl Into<String>) -> Self {
        self.model_dir = Some(v.into());
        self
    }

    pub fn fps(mut self, v: Option<f32>) -> Self {
        self.fps = v;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_actor_config() -> Result<()> {
        let config = ActorConfig::default()
            .n_episodes(20)
            .model_dir("model")
            .fps(None);
        let dir = TempDir::new("actor_config")?;
        let path = dir.path().join("actor.yaml");
        config.save(&path)?;
        assert_eq!(ActorConfig::load(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_default_pacing() {
        let config = ActorConfig::default();
        assert_eq!(config.fps, Some(20.0));
        assert_eq!(config.aggregate_stats_every, 10);
        assert_eq!(config.min_reward, -200.0);
    }
}
