//! Static camera writing its frames to disk.
use crate::{
    lookup::ActorSelector,
    obs::CameraObs,
    types::{ActorId, SensorData, Transform},
    World,
};
use anyhow::{anyhow, Result};
use chrono::Local;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

/// Configuration of [`CameraRig`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CameraRigConfig {
    /// Prefix of the file names.
    pub name: String,
    pub out_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fov: f32,

    /// Where the camera is placed if no selector is given.
    pub transform: Transform,

    /// Places the camera above the selected actor.
    pub selector: Option<ActorSelector>,

    /// Height above the selected actor.
    pub z_offset: f32,

    /// Interval of the world ticks in [`CameraRig::run_for`].
    pub tick_interval_ms: u64,

    /// Interval of logging the spectator location.
    pub log_interval_secs: f32,
}

impl Default for CameraRigConfig {
    fn default() -> Self {
        Self {
            name: "camera01".to_string(),
            out_dir: PathBuf::from("frames"),
            width: 640,
            height: 480,
            fov: 110.0,
            transform: Transform::at(40.0, 10.8, 10.59),
            selector: None,
            z_offset: 2.0,
            tick_interval_ms: 50,
            log_interval_secs: 2.0,
        }
    }
}

impl CameraRigConfig {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = out_dir.into();
        self
    }

    pub fn image_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn selector(mut self, selector: ActorSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }
}

/// A camera spawned into a world, saving every frame as a PNG file named
/// `{name}-{timestamp}.png`.
///
/// The camera is destroyed on drop.
pub struct CameraRig<W: World> {
    config: CameraRigConfig,
    world: W,
    camera: ActorId,
    n_saved: Arc<AtomicUsize>,
}

impl<W: World> CameraRig<W> {
    pub fn spawn(mut world: W, config: &CameraRigConfig) -> Result<Self> {
        let transform = match &config.selector {
            None => config.transform,
            Some(selector) => {
                let actor = selector
                    .select(&world)
                    .ok_or_else(|| anyhow!("No actor matches {:?}", selector))?;
                info!("Placing camera above {} {:?}", actor.type_id, actor.id);
                let mut t = actor.transform;
                t.location.z += config.z_offset;
                t
            }
        };

        std::fs::create_dir_all(&config.out_dir)?;
        let bp = world
            .find_blueprint("sensor.camera.rgb")?
            .with_attribute("image_size_x", config.width)
            .with_attribute("image_size_y", config.height)
            .with_attribute("fov", config.fov);
        let camera = world.spawn_actor(&bp, &transform, None)?;
        info!("Spawned camera {:?} at {:?}", camera, transform.location);

        let n_saved = Arc::new(AtomicUsize::new(0));
        let (name, out_dir, n_saved_) = (
            config.name.clone(),
            config.out_dir.clone(),
            n_saved.clone(),
        );
        let callback = move |data: SensorData| {
            if let SensorData::Image(raw) = data {
                let ts = Local::now().format("%Y%m%d-%H%M%S%.6f");
                let path = out_dir.join(format!("{}-{}.png", name, ts));
                match CameraObs::from_raw(&raw, None).and_then(|obs| obs.save_png(&path)) {
                    Ok(()) => {
                        n_saved_.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => warn!("Failed to save frame {}: {}", raw.frame, e),
                }
            }
        };

        let mut rig = Self {
            config: config.clone(),
            world,
            camera,
            n_saved,
        };
        rig.world.listen(camera, Box::new(callback))?;
        Ok(rig)
    }

    pub fn camera(&self) -> ActorId {
        self.camera
    }

    /// Number of frames written so far.
    pub fn n_saved(&self) -> usize {
        self.n_saved.load(Ordering::Relaxed)
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    /// Keeps the world running for `duration`, logging the spectator
    /// location periodically.
    pub fn run_for(&mut self, duration: Duration) -> Result<()> {
        let start = Instant::now();
        let log_interval = Duration::from_secs_f32(self.config.log_interval_secs);
        let mut last_log: Option<Instant> = None;

        while start.elapsed() < duration {
            self.world.tick()?;
            if last_log.map_or(true, |t| t.elapsed() >= log_interval) {
                let l = self.world.spectator_transform()?.location;
                info!(
                    "(x,y,z) = ({:.2},{:.2},{:.2}), {} frames saved",
                    l.x,
                    l.y,
                    l.z,
                    self.n_saved()
                );
                last_log = Some(Instant::now());
            }
            thread::sleep(Duration::from_millis(self.config.tick_interval_ms));
        }
        Ok(())
    }
}

impl<W: World> Drop for CameraRig<W> {
    fn drop(&mut self) {
        if let Err(e) = self.world.destroy_actor(self.camera) {
            warn!("Failed to destroy camera {:?}: {}", self.camera, e);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sandbox::{SandboxConfig, SandboxWorld};
    use tempdir::TempDir;

    #[test]
    fn test_camera_rig_above_traffic_light() -> Result<()> {
        let dir = TempDir::new("camera_rig")?;
        let world = SandboxWorld::new(SandboxConfig::default().synchronous(true))?;
        let config = CameraRigConfig::default()
            .name("cam")
            .out_dir(dir.path())
            .image_size(16, 12)
            .selector(ActorSelector::new("traffic.traffic_light").nth(1))
            .tick_interval_ms(5);

        {
            let mut rig = CameraRig::spawn(world.clone(), &config)?;
            let light = config.selector.as_ref().unwrap().select(&world).unwrap();
            let camera = rig.world().transform(rig.camera())?;
            assert_eq!(camera.location.x, light.transform.location.x);
            assert_eq!(camera.location.z, light.transform.location.z + 2.0);

            rig.run_for(Duration::from_millis(100))?;
            assert!(rig.n_saved() > 0);
        }

        let n_files = std::fs::read_dir(dir.path())?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("cam-"))
            .count();
        assert!(n_files > 0);
        // Only the traffic lights are left.
        assert_eq!(world.actors().len(), 4);
        Ok(())
    }

    #[test]
    fn test_camera_rig_without_match() {
        let world = SandboxWorld::new(SandboxConfig::default().synchronous(true)).unwrap();
        let dir = TempDir::new("camera_rig").unwrap();
        let config = CameraRigConfig::default()
            .out_dir(dir.path())
            .selector(ActorSelector::new("vehicle.*"));
        assert!(CameraRig::spawn(world, &config).is_err());
    }
}
