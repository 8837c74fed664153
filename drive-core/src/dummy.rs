//! Lightweight environment and agent used in tests of the training loops.
use crate::{
    record::{Record, RecordValue},
    replay_buffer::ReplayMemory,
    Act, Agent, Configurable, Env, Obs, Policy, ReplayBufferBase, Step,
};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Dummy observation, the step count within the episode.
#[derive(Clone, Debug, PartialEq)]
pub struct DummyObs(pub usize);

impl Obs for DummyObs {}

/// Dummy action.
#[derive(Clone, Debug, PartialEq)]
pub struct DummyAct(pub usize);

impl Act for DummyAct {}

/// Configuration of [`DummyEnv`].
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DummyEnvConfig {
    /// Number of steps until the episode terminates.
    pub episode_len: usize,
}

/// An environment emitting reward 1 at every step and terminating after
/// a fixed number of steps.
pub struct DummyEnv {
    episode_len: usize,
    t: usize,
}

impl Env for DummyEnv {
    type Config = DummyEnvConfig;
    type Obs = DummyObs;
    type Act = DummyAct;
    type Info = ();

    fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
        Ok(Self {
            episode_len: config.episode_len,
            t: 0,
        })
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        self.t = 0;
        Ok(DummyObs(0))
    }

    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)> {
        self.t += 1;
        let is_terminated = self.t >= self.episode_len;
        let step = Step::new(DummyObs(self.t), a.clone(), 1.0, is_terminated, false, ());
        Ok((step, Record::empty()))
    }
}

/// Replay memory for [`DummyEnv`].
pub type DummyReplayMemory = ReplayMemory<DummyObs, DummyAct>;

/// Configuration of [`DummyAgent`].
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DummyAgentConfig {
    /// Optimization steps are skipped until the buffer holds this many items.
    pub warmup: usize,

    /// Size of batches drawn in an optimization step.
    pub batch_size: usize,

    /// If set, the optimization step with this index returns an error.
    pub fail_at: Option<usize>,
}

/// An agent that always takes action 0 and counts optimization steps.
pub struct DummyAgent {
    config: DummyAgentConfig,
    train: bool,
    n_opts: usize,
    n_episodes: usize,
}

impl DummyAgent {
    /// Number of optimization steps done so far.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// Number of finished episodes reported through [`Agent::on_episode_end`].
    pub fn n_episodes(&self) -> usize {
        self.n_episodes
    }
}

impl Configurable for DummyAgent {
    type Config = DummyAgentConfig;

    fn build(config: Self::Config) -> Result<Self> {
        Ok(Self {
            config,
            train: true,
            n_opts: 0,
            n_episodes: 0,
        })
    }
}

impl Policy<DummyEnv> for DummyAgent {
    fn sample(&mut self, _obs: &DummyObs) -> Result<DummyAct> {
        Ok(DummyAct(0))
    }
}

impl Agent<DummyEnv, DummyReplayMemory> for DummyAgent {
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn opt(&mut self, buffer: &mut DummyReplayMemory) -> Result<Option<Record>> {
        if ReplayBufferBase::len(buffer) < self.config.warmup {
            return Ok(None);
        }
        if self.config.fail_at == Some(self.n_opts) {
            bail!("optimization step {} failed", self.n_opts);
        }
        let batch = buffer.batch(self.config.batch_size)?;
        self.n_opts += 1;

        Ok(Some(Record::from_slice(&[
            ("batch_size", RecordValue::Scalar(batch.len() as f32)),
            ("n_opts", RecordValue::Scalar(self.n_opts as f32)),
        ])))
    }

    fn on_episode_end(&mut self) -> Record {
        self.n_episodes += 1;
        Record::from_scalar("n_episodes", self.n_episodes as f32)
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)?;
        std::fs::write(path.join("n_opts.txt"), self.n_opts.to_string())?;
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.n_opts = std::fs::read_to_string(path.join("n_opts.txt"))?
            .trim()
            .parse()?;
        Ok(())
    }
}
