//! Training a DQN agent to keep a car on the road.
//!
//! The workspace consists of the following crates:
//!
//! * `drive-core` provides the traits of environments and agents, records and
//!   the replay memory.
//! * `drive-sim-env` defines the simulator interface, the lane-driving
//!   environment on top of it and an in-process sandbox simulator.
//! * `drive-candle-agent` implements the DQN agent with
//!   [candle](https://crates.io/crates/candle-core).
//! * `drive-async-trainer` runs the learner on a background thread while the
//!   actor drives the car.
//! * `drive-tensorboard` writes records for Tensorboard.
//!
//! This crate ties them together on the sandbox simulator.
pub mod config;
use anyhow::Result;
use config::DriveConfig;
use drive_async_trainer::{train_async, ActorStat, AsyncTrainStat};
use drive_candle_agent::{cnn::Cnn, dqn::Dqn};
use drive_core::record::{NullRecorder, Recorder};
use drive_sim_env::{
    sandbox::{SandboxClient, SandboxConfig},
    ActorSelector, CameraObs, CameraRig, CameraRigConfig, CarEnv, Client, SteerAct,
};
use drive_tensorboard::TensorboardRecorder;
use log::info;
use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

pub type Env = CarEnv<SandboxClient>;
pub type ReplayMemory = drive_core::replay_buffer::ReplayMemory<CameraObs, SteerAct>;
pub type Agent = Dqn<Env, Cnn, ReplayMemory>;

/// Overrides of [`DriveConfig`] given on the command line.
#[derive(Clone, Debug, Default)]
pub struct TrainOptions {
    pub model_dir: Option<String>,
    pub n_episodes: Option<usize>,
    pub seed: Option<u64>,
    pub tensorboard: bool,
}

/// Applies `opts` to a copy of `config`.
pub fn apply_options(config: &DriveConfig, opts: &TrainOptions) -> DriveConfig {
    let mut config = config.clone();
    if let Some(model_dir) = &opts.model_dir {
        config.trainer.model_dir = Some(model_dir.clone());
        config.actor.model_dir = Some(model_dir.clone());
    }
    if let Some(n_episodes) = opts.n_episodes {
        config.actor.n_episodes = n_episodes;
    }
    if let Some(seed) = opts.seed {
        config.agent.seed = seed;
        config.memory.seed = seed;
    }
    // The environment ticks the world only if the simulator waits for it.
    config.env.synchronous = config.env.client.synchronous;
    config
}

fn tensorboard_dir(model_dir: &str, model_name: &str) -> PathBuf {
    let unix_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    Path::new(model_dir)
        .join("logs")
        .join(format!("{}-{}", model_name, unix_secs))
}

/// Trains the agent on the sandbox simulator.
pub fn train(config: &DriveConfig, opts: &TrainOptions) -> Result<(AsyncTrainStat, ActorStat)> {
    let config = apply_options(config, opts);
    let seed = opts.seed.unwrap_or(0) as i64;

    if let Some(model_dir) = &config.trainer.model_dir {
        std::fs::create_dir_all(model_dir)?;
        config.save(Path::new(model_dir).join("drive.yaml"))?;
    }

    let (learner_recorder, mut actor_recorder): (Box<dyn Recorder + Send>, Box<dyn Recorder>) =
        match (&config.trainer.model_dir, opts.tensorboard) {
            (Some(model_dir), true) => {
                let logdir = tensorboard_dir(model_dir, &config.actor.model_name);
                info!("Writing tensorboard logs in {:?}", logdir);
                (
                    Box::new(TensorboardRecorder::new(logdir.join("learner"), "opt_steps")),
                    Box::new(TensorboardRecorder::new(logdir.join("actor"), "episode")),
                )
            }
            _ => (Box::new(NullRecorder {}), Box::new(NullRecorder {})),
        };

    train_async::<Agent, Env, ReplayMemory>(
        &config.agent,
        &config.env,
        &config.memory,
        &config.trainer,
        &config.actor,
        seed,
        learner_recorder,
        &mut actor_recorder,
    )
}

/// Saves frames of a static camera for `secs` seconds, returning the number
/// of saved frames.
pub fn capture(
    sandbox: &SandboxConfig,
    rig_config: &CameraRigConfig,
    out_dir: Option<&str>,
    selector: Option<&str>,
    secs: f32,
) -> Result<usize> {
    let mut rig_config = rig_config.clone();
    if let Some(out_dir) = out_dir {
        rig_config = rig_config.out_dir(out_dir);
    }
    if let Some(pattern) = selector {
        rig_config = rig_config.selector(ActorSelector::new(pattern));
    }

    let client = SandboxClient::connect(sandbox)?;
    let mut rig = CameraRig::spawn(client.world()?, &rig_config)?;
    rig.run_for(Duration::from_secs_f32(secs))?;
    info!("Saved {} frames in {:?}", rig.n_saved(), rig_config.out_dir);

    Ok(rig.n_saved())
}

/// Writes the default configuration.
pub fn write_default_config(path: impl AsRef<Path>) -> Result<()> {
    DriveConfig::default().save(path)
}

#[cfg(test)]
mod test {
    use super::*;
    use drive_candle_agent::cnn::{CnnConfig, ConvLayerConfig};
    use drive_candle_agent::dqn::DqnModelConfig;
    use drive_sim_env::RewardPolicy;
    use tempdir::TempDir;

    #[test]
    fn test_default_config_roundtrip() -> Result<()> {
        let dir = TempDir::new("drive_config")?;
        let path = dir.path().join("drive.yaml");
        write_default_config(&path)?;

        let config = DriveConfig::load(&path)?;
        let default = DriveConfig::default();
        assert_eq!(config.agent, default.agent);
        assert_eq!(config.trainer, default.trainer);
        assert_eq!(config.actor, default.actor);
        assert_eq!(config.memory.capacity, 5000);
        assert_eq!(config.agent.batch_size, 16);
        assert_eq!(config.agent.min_transitions_warmup, 1000);
        assert_eq!(config.agent.target_update_interval, 5);
        Ok(())
    }

    #[test]
    fn test_apply_options() {
        let config = DriveConfig::default();
        let opts = TrainOptions {
            model_dir: Some("model".to_string()),
            n_episodes: Some(3),
            seed: Some(7),
            tensorboard: false,
        };
        let config = apply_options(&config, &opts);
        assert_eq!(config.trainer.model_dir.as_deref(), Some("model"));
        assert_eq!(config.actor.model_dir.as_deref(), Some("model"));
        assert_eq!(config.actor.n_episodes, 3);
        assert_eq!(config.agent.seed, 7);
        assert_eq!(config.env.synchronous, config.env.client.synchronous);
    }

    #[test]
    fn test_capture_above_traffic_light() -> Result<()> {
        let dir = TempDir::new("capture")?;
        let sandbox = SandboxConfig::default().synchronous(true);
        let rig_config = CameraRigConfig::default()
            .image_size(64, 48)
            .tick_interval_ms(1);
        let n = capture(
            &sandbox,
            &rig_config,
            dir.path().to_str(),
            Some("traffic.traffic_light"),
            0.2,
        )?;
        assert!(n > 0);
        assert!(std::fs::read_dir(dir.path())?.count() > 0);
        Ok(())
    }

    #[test]
    fn test_train_smoke() -> Result<()> {
        let dir = TempDir::new("train")?;
        // The default sandbox runs its own server thread.
        let mut config = DriveConfig::default();
        assert!(!config.env.client.synchronous);
        config.env.client = config.env.client.tick_hz(100.0);
        config.env = config
            .env
            .obs_size(32, 24)
            .settle(0.05, 0)
            .frame_timeout_secs(Some(2.0))
            .reward(RewardPolicy::default().seconds_per_episode(1.0));
        let q_config = CnnConfig::default().conv_layers(vec![ConvLayerConfig::new(4, 3, 2)]);
        config.agent = config
            .agent
            .model_config(DqnModelConfig::default().q_config(q_config))
            .min_transitions_warmup(8)
            .batch_size(4);
        config.trainer = config.trainer.idle_ms(1).record_interval(1);
        config.actor = config.actor.fps(None).aggregate_stats_every(1);

        let opts = TrainOptions {
            model_dir: dir.path().to_str().map(|s| s.to_string()),
            n_episodes: Some(2),
            seed: Some(1),
            tensorboard: true,
        };
        let (_, actor_stat) = train(&config, &opts)?;
        assert_eq!(actor_stat.n_episodes, 2);
        assert!(actor_stat.env_steps > 0);
        assert!(dir.path().join("drive.yaml").is_file());
        assert!(dir.path().join("final").join("qnet.safetensors").is_file());
        assert!(dir.path().join("logs").is_dir());
        Ok(())
    }
}
