//! Configuration of [`CarEnv`](super::CarEnv).
use crate::{reward::RewardPolicy, types::Transform};
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// RGB camera mounted on the vehicle.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CameraConfig {
    /// Blueprint id of the camera.
    pub blueprint: String,
    pub width: u32,
    pub height: u32,

    /// Horizontal field of view in degrees.
    pub fov: f32,

    /// Mount position relative to the vehicle.
    pub mount: Transform,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            blueprint: "sensor.camera.rgb".to_string(),
            width: 640,
            height: 480,
            fov: 100.0,
            mount: Transform::at(2.5, 0.0, 0.7),
        }
    }
}

/// Configuration of [`CarEnv`](super::CarEnv).
///
/// `CC` is the configuration of the simulator client.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CarEnvConfig<CC> {
    pub client: CC,

    /// Pattern selecting the vehicle blueprint; the first match is used.
    pub vehicle_filter: String,

    pub camera: CameraConfig,

    /// Blueprint id of the collision sensor.
    pub collision_sensor: String,

    /// Size `(width, height)` of observations. Defaults to the camera size.
    pub obs_size: Option<(u32, u32)>,

    pub steer_amount: f32,
    pub throttle: f32,

    /// Candidate spawn points. `None` uses the spawn points of the map.
    pub spawn_points: Option<Vec<Transform>>,

    /// Wait after spawning before the episode starts, so that the vehicle
    /// has landed on the road.
    pub settle_secs: f32,

    /// Number of ticks replacing `settle_secs` in synchronous mode.
    pub settle_ticks: usize,

    /// Polling interval while waiting for the first camera frame.
    pub frame_poll_ms: u64,

    /// Give up waiting for the first camera frame after this time.
    /// `None` waits forever.
    pub frame_timeout_secs: Option<f32>,

    /// Advance the world by one tick in every step.
    pub synchronous: bool,

    pub reward: RewardPolicy,

    /// If set, every observed frame is written into this directory as PNG.
    pub frame_dump_dir: Option<PathBuf>,
}

impl<CC: Default> Default for CarEnvConfig<CC> {
    fn default() -> Self {
        Self {
            client: CC::default(),
            vehicle_filter: "model3".to_string(),
            camera: CameraConfig::default(),
            collision_sensor: "sensor.other.collision".to_string(),
            obs_size: None,
            steer_amount: 1.0,
            throttle: 1.0,
            spawn_points: None,
            settle_secs: 4.0,
            settle_ticks: 80,
            frame_poll_ms: 10,
            frame_timeout_secs: None,
            synchronous: false,
            reward: RewardPolicy::default(),
            frame_dump_dir: None,
        }
    }
}

impl<CC> CarEnvConfig<CC> {
    pub fn client(mut self, client: CC) -> Self {
        self.client = client;
        self
    }

    pub fn vehicle_filter(mut self, pattern: impl Into<String>) -> Self {
        self.vehicle_filter = pattern.into();
        self
    }

    pub fn camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    pub fn obs_size(mut self, width: u32, height: u32) -> Self {
        self.obs_size = Some((width, height));
        self
    }

    pub fn spawn_points(mut self, spawn_points: Vec<Transform>) -> Self {
        self.spawn_points = Some(spawn_points);
        self
    }

    pub fn settle(mut self, secs: f32, ticks: usize) -> Self {
        self.settle_secs = secs;
        self.settle_ticks = ticks;
        self
    }

    pub fn frame_timeout_secs(mut self, secs: Option<f32>) -> Self {
        self.frame_timeout_secs = secs;
        self
    }

    pub fn synchronous(mut self, synchronous: bool) -> Self {
        self.synchronous = synchronous;
        self
    }

    pub fn reward(mut self, reward: RewardPolicy) -> Self {
        self.reward = reward;
        self
    }

    pub fn frame_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.frame_dump_dir = Some(dir.into());
        self
    }

    /// Size `(width, height)` of observations.
    pub fn effective_obs_size(&self) -> (u32, u32) {
        self.obs_size
            .unwrap_or((self.camera.width, self.camera.height))
    }
}

impl<CC: Serialize + DeserializeOwned> CarEnvConfig<CC> {
    /// Constructs [`CarEnvConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`CarEnvConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ClientConfig;
    use tempdir::TempDir;

    #[test]
    fn test_serde_car_env_config() -> Result<()> {
        let config = CarEnvConfig::<ClientConfig>::default()
            .obs_size(160, 120)
            .frame_dump_dir("/tmp/frames")
            .synchronous(true);
        assert_eq!(config.effective_obs_size(), (160, 120));

        let dir = TempDir::new("car_env_config")?;
        let path = dir.path().join("car_env_config.yaml");
        config.save(&path)?;
        let config_ = CarEnvConfig::<ClientConfig>::load(&path)?;
        assert_eq!(config_.client, config.client);
        assert_eq!(config_.camera, config.camera);
        assert_eq!(config_.obs_size, Some((160, 120)));
        assert_eq!(config_.frame_dump_dir, config.frame_dump_dir);
        assert!(config_.synchronous);
        Ok(())
    }
}
