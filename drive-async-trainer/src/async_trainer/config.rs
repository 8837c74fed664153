use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`AsyncTrainer`](crate::AsyncTrainer).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AsyncTrainerConfig {
    /// If set, the learner finishes by itself after this many optimization steps.
    pub max_opts: Option<usize>,

    /// Where to save the trained model.
    pub model_dir: Option<String>,

    /// Sleep in milliseconds when the agent skipped optimization.
    pub idle_ms: u64,

    /// Interval of recording in optimization steps.
    pub record_interval: usize,

    /// Interval of saving the model in optimization steps.
    pub save_interval: usize,

    /// Interval of publishing model parameters to the actor in optimization steps.
    pub sync_interval: usize,
}

impl AsyncTrainerConfig {
    /// Constructs [AsyncTrainerConfig] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [AsyncTrainerConfig].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    /// Sets the directory the trained model being saved.
    pub fn model_dir<T: Into<String>>(mut self, model_dir: T) -> Self {
        self.model_dir = Some(model_dir.into());
        self
    }

    pub fn max_opts(mut self, v: usize) -> Self {
        self.max_opts = Some(v);
        self
    }

    pub fn idle_ms(mut self, v: u64) -> Self {
        self.idle_ms = v;
        self
    }

    pub fn record_interval(mut self, v: usize) -> Self {
        self.record_interval = v;
        self
    }

    pub fn save_interval(mut self, v: usize) -> Self {
        self.save_interval = v;
        self
    }

    pub fn sync_interval(mut self, v: usize) -> Self {
        self.sync_interval = v;
        self
    }
}

impl Default for AsyncTrainerConfig {
    fn default() -> Self {
        Self {
            max_opts: None,
            model_dir: None,
            idle_ms: 10,
            record_interval: 100,
            save_interval: 10000,
            sync_interval: 10,
        }
    }
}
