use anyhow::Result;
use drive_async_trainer::{
    train_async, ActorConfig, AsyncTrainerConfig, AsyncTrainerError, SyncModel,
};
use drive_core::{
    dummy::{
        DummyAct, DummyAgent, DummyAgentConfig, DummyEnv, DummyEnvConfig, DummyObs,
        DummyReplayMemory,
    },
    record::{BufferedRecorder, NullRecorder, Record},
    replay_buffer::ReplayMemoryConfig,
    Agent, Configurable, Policy, ReplayBufferBase,
};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use tempdir::TempDir;
use test_log::test;

#[derive(Clone, Debug, Deserialize, Serialize)]
struct ScriptedAgentConfig {
    agent: DummyAgentConfig,

    /// The optimization step with this index panics.
    panic_at: Option<usize>,

    /// Sleep in every call of `sample`, in milliseconds.
    sample_delay_ms: u64,

    /// Sleep in every optimization step, in milliseconds.
    opt_delay_ms: u64,
}

/// [`DummyAgent`] that can panic and be slowed down.
struct ScriptedAgent {
    inner: DummyAgent,
    panic_at: Option<usize>,
    sample_delay: Duration,
    opt_delay: Duration,
}

impl Configurable for ScriptedAgent {
    type Config = ScriptedAgentConfig;

    fn build(config: Self::Config) -> Result<Self> {
        Ok(Self {
            inner: DummyAgent::build(config.agent)?,
            panic_at: config.panic_at,
            sample_delay: Duration::from_millis(config.sample_delay_ms),
            opt_delay: Duration::from_millis(config.opt_delay_ms),
        })
    }
}

impl Policy<DummyEnv> for ScriptedAgent {
    fn sample(&mut self, obs: &DummyObs) -> Result<DummyAct> {
        std::thread::sleep(self.sample_delay);
        self.inner.sample(obs)
    }
}

impl Agent<DummyEnv, DummyReplayMemory> for ScriptedAgent {
    fn train(&mut self) {
        self.inner.train()
    }

    fn eval(&mut self) {
        self.inner.eval()
    }

    fn is_train(&self) -> bool {
        self.inner.is_train()
    }

    fn opt(&mut self, buffer: &mut DummyReplayMemory) -> Result<Option<Record>> {
        if ReplayBufferBase::len(buffer) >= 3 && self.panic_at == Some(self.inner.n_opts()) {
            panic!("scripted panic");
        }
        let record = self.inner.opt(buffer)?;
        if record.is_some() {
            std::thread::sleep(self.opt_delay);
        }
        Ok(record)
    }

    fn on_episode_end(&mut self) -> Record {
        self.inner.on_episode_end()
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        self.inner.save_params(path)
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.inner.load_params(path)
    }
}

impl SyncModel for ScriptedAgent {
    type ModelInfo = usize;

    fn model_info(&self) -> Result<(usize, usize)> {
        Ok((self.inner.n_opts(), self.inner.n_opts()))
    }

    fn sync_model(&mut self, _model_info: &usize) -> Result<()> {
        Ok(())
    }
}

fn agent_config(fail_at: Option<usize>, panic_at: Option<usize>, delay: u64) -> ScriptedAgentConfig {
    ScriptedAgentConfig {
        agent: DummyAgentConfig {
            warmup: 3,
            batch_size: 4,
            fail_at,
        },
        panic_at,
        sample_delay_ms: delay,
        opt_delay_ms: 0,
    }
}

fn run(
    agent_config: &ScriptedAgentConfig,
    trainer_config: &AsyncTrainerConfig,
    actor_config: &ActorConfig,
    recorder: &mut BufferedRecorder,
) -> Result<(drive_async_trainer::AsyncTrainStat, drive_async_trainer::ActorStat)> {
    run_with_episode_len(agent_config, 5, trainer_config, actor_config, recorder)
}

fn run_with_episode_len(
    agent_config: &ScriptedAgentConfig,
    episode_len: usize,
    trainer_config: &AsyncTrainerConfig,
    actor_config: &ActorConfig,
    recorder: &mut BufferedRecorder,
) -> Result<(drive_async_trainer::AsyncTrainStat, drive_async_trainer::ActorStat)> {
    train_async::<ScriptedAgent, DummyEnv, DummyReplayMemory>(
        agent_config,
        &DummyEnvConfig { episode_len },
        &ReplayMemoryConfig::default().capacity(50),
        trainer_config,
        actor_config,
        0,
        Box::new(NullRecorder {}),
        recorder,
    )
}

#[test]
fn test_train_async_saves_final_model_and_checkpoints() -> Result<()> {
    let dir = TempDir::new("train_async")?;
    let model_dir = dir.path().to_str().unwrap();
    let trainer_config = AsyncTrainerConfig::default()
        .model_dir(model_dir)
        .idle_ms(1)
        .save_interval(0);
    let actor_config = ActorConfig::default()
        .n_episodes(20)
        .model_name("dummy")
        .model_dir(model_dir)
        .fps(None);
    let mut recorder = BufferedRecorder::new();

    let (_, actor_stat) = run(
        &agent_config(None, None, 1),
        &trainer_config,
        &actor_config,
        &mut recorder,
    )?;

    assert_eq!(actor_stat.n_episodes, 20);
    assert_eq!(actor_stat.env_steps, 100);
    assert!(dir.path().join("final").join("n_opts.txt").is_file());

    // Episodes 1, 10 and 20 are aggregated, each reaching the reward threshold.
    assert_eq!(recorder.len(), 3);
    let n_checkpoints = std::fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("dummy__"))
        .count();
    assert!(n_checkpoints >= 1);
    Ok(())
}

#[test]
fn test_learner_error_is_surfaced() -> Result<()> {
    let trainer_config = AsyncTrainerConfig::default().idle_ms(1);
    let actor_config = ActorConfig::default().n_episodes(1000).fps(None);
    let mut recorder = BufferedRecorder::new();

    let err = run(
        &agent_config(Some(0), None, 1),
        &trainer_config,
        &actor_config,
        &mut recorder,
    )
    .unwrap_err();
    assert!(err.to_string().contains("optimization step 0 failed"));
    Ok(())
}

#[test]
fn test_learner_panic_is_surfaced() -> Result<()> {
    let trainer_config = AsyncTrainerConfig::default().idle_ms(1);
    let actor_config = ActorConfig::default().n_episodes(1000).fps(None);
    let mut recorder = BufferedRecorder::new();

    let err = run(
        &agent_config(None, Some(0), 1),
        &trainer_config,
        &actor_config,
        &mut recorder,
    )
    .unwrap_err();
    match err.downcast_ref::<AsyncTrainerError>() {
        Some(AsyncTrainerError::LearnerPanicked(msg)) => assert_eq!(msg, "scripted panic"),
        _ => panic!("unexpected error: {}", err),
    }
    Ok(())
}

#[test]
fn test_learner_stops_after_max_opts() -> Result<()> {
    let trainer_config = AsyncTrainerConfig::default().idle_ms(1).max_opts(5);
    let actor_config = ActorConfig::default().n_episodes(1000).fps(None);
    let mut recorder = BufferedRecorder::new();

    let (trainer_stat, actor_stat) = run(
        &agent_config(None, None, 1),
        &trainer_config,
        &actor_config,
        &mut recorder,
    )?;
    assert_eq!(trainer_stat.opt_steps, 5);
    assert!(actor_stat.n_episodes < 1000);
    Ok(())
}

#[test]
fn test_actor_does_not_wait_for_optimization_steps() -> Result<()> {
    let agent_config = ScriptedAgentConfig {
        opt_delay_ms: 50,
        ..agent_config(None, None, 1)
    };
    let trainer_config = AsyncTrainerConfig::default().idle_ms(1);
    let actor_config = ActorConfig::default().n_episodes(10).fps(None);
    let mut recorder = BufferedRecorder::new();

    let (trainer_stat, actor_stat) = run_with_episode_len(
        &agent_config,
        20,
        &trainer_config,
        &actor_config,
        &mut recorder,
    )?;
    assert_eq!(actor_stat.env_steps, 200);
    assert!(trainer_stat.opt_steps > 0);

    // 200 steps of 1 ms each. Waiting for 50 ms optimization steps on every
    // push would take 10 s or more.
    assert!(
        actor_stat.duration < Duration::from_secs(3),
        "actor took {:?}",
        actor_stat.duration
    );
    Ok(())
}
