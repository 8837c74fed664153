//! Configuration of the command line tool.
use anyhow::Result;
use drive_async_trainer::{ActorConfig, AsyncTrainerConfig};
use drive_candle_agent::{
    cnn::CnnConfig,
    dqn::{DqnConfig, DqnModelConfig},
    opt::OptimizerConfig,
    Device,
};
use drive_core::{replay_buffer::ReplayMemoryConfig, DiscreteAct};
use drive_sim_env::{sandbox::SandboxConfig, CameraRigConfig, CarEnvConfig, SteerAct};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// All sections of a training or capture run, stored in a single YAML file.
///
/// The simulator is configured in `env.client`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DriveConfig {
    pub env: CarEnvConfig<SandboxConfig>,
    pub agent: DqnConfig<CnnConfig>,
    pub memory: ReplayMemoryConfig,
    pub trainer: AsyncTrainerConfig,
    pub actor: ActorConfig,
    pub capture: CameraRigConfig,
}

impl Default for DriveConfig {
    fn default() -> Self {
        let n_actions = SteerAct::n_actions() as i64;
        let model_config = DqnModelConfig::default()
            .q_config(CnnConfig::default())
            .out_dim(n_actions)
            .opt_config(OptimizerConfig::Adam { lr: 0.001 });

        Self {
            // Frames are downscaled before entering the network.
            env: CarEnvConfig::default().obs_size(160, 120),
            agent: DqnConfig::default()
                .model_config(model_config)
                .device(Device::Cpu),
            memory: ReplayMemoryConfig::default(),
            trainer: AsyncTrainerConfig::default(),
            actor: ActorConfig::default(),
            capture: CameraRigConfig::default(),
        }
    }
}

impl DriveConfig {
    /// Constructs [`DriveConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DriveConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
