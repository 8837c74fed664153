//! Lane-driving environment on a simulator [`World`].
mod config;
use crate::{
    act::SteerAct,
    error::SimError,
    mailbox::{CollisionLog, FrameSlot},
    obs::CameraObs,
    types::{ActorId, Blueprint, SensorData, Transform, VehicleControl},
    Client, World,
};
use anyhow::Result;
pub use config::{CameraConfig, CarEnvConfig};
use drive_core::{
    record::{Record, RecordValue},
    Env, Step,
};
use log::{debug, info, warn};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::{
    thread,
    time::{Duration, Instant},
};

/// A car driving with full throttle, steered by [`SteerAct`] and observed
/// through a front camera.
///
/// An episode ends on a collision or when the time budget of the
/// [`RewardPolicy`](crate::RewardPolicy) runs out. Spawned actors are
/// destroyed at the next reset, in [`CarEnv::close`] and on drop.
pub struct CarEnv<C: Client> {
    config: CarEnvConfig<C::Config>,
    world: C::World,
    _client: C,
    rng: StdRng,
    vehicle_bp: Blueprint,
    camera_bp: Blueprint,
    collision_bp: Blueprint,
    spawn_candidates: Vec<Transform>,
    vehicle: Option<ActorId>,
    actors: Vec<ActorId>,
    frames: FrameSlot,
    collisions: CollisionLog,
    episode_start: Instant,
    n_episodes: usize,
    n_steps: usize,
}

impl<C: Client> CarEnv<C> {
    /// Builds the environment on a connected client.
    pub fn from_client(client: C, config: &CarEnvConfig<C::Config>, seed: i64) -> Result<Self> {
        let world = client.world()?;

        let vehicle_bp = world
            .filter_blueprints(&config.vehicle_filter)
            .into_iter()
            .next()
            .ok_or_else(|| SimError::BlueprintNotFound(config.vehicle_filter.clone()))?;
        let camera_bp = world
            .find_blueprint(&config.camera.blueprint)?
            .with_attribute("image_size_x", config.camera.width)
            .with_attribute("image_size_y", config.camera.height)
            .with_attribute("fov", config.camera.fov);
        let collision_bp = world.find_blueprint(&config.collision_sensor)?;

        let spawn_candidates = match &config.spawn_points {
            Some(points) => points.clone(),
            None => world.spawn_points(),
        };
        if spawn_candidates.is_empty() {
            return Err(SimError::NoSpawnPoints.into());
        }
        info!(
            "Built CarEnv with vehicle {} and {} spawn points",
            vehicle_bp.id(),
            spawn_candidates.len()
        );

        Ok(Self {
            config: config.clone(),
            world,
            _client: client,
            rng: StdRng::seed_from_u64(seed as u64),
            vehicle_bp,
            camera_bp,
            collision_bp,
            spawn_candidates,
            vehicle: None,
            actors: Vec::new(),
            frames: FrameSlot::new(),
            collisions: CollisionLog::new(),
            episode_start: Instant::now(),
            n_episodes: 0,
            n_steps: 0,
        })
    }

    /// The controlled vehicle of the running episode.
    pub fn vehicle(&self) -> Option<ActorId> {
        self.vehicle
    }

    /// Actors spawned for the running episode, vehicle first.
    pub fn actors(&self) -> &[ActorId] {
        &self.actors
    }

    pub fn world(&self) -> &C::World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut C::World {
        &mut self.world
    }

    /// Collision events of the running episode.
    pub fn collisions(&self) -> &CollisionLog {
        &self.collisions
    }

    /// Destroys all actors spawned by this environment.
    pub fn close(&mut self) {
        self.release_actors();
    }

    fn release_actors(&mut self) {
        // Sensors first, then the vehicle they are attached to.
        for id in self.actors.drain(..).rev() {
            if let Err(e) = self.world.destroy_actor(id) {
                warn!("Failed to destroy actor {:?}: {}", id, e);
            }
        }
        self.vehicle = None;
    }

    fn settle(&mut self) -> Result<()> {
        if self.config.synchronous {
            for _ in 0..self.config.settle_ticks {
                self.world.tick()?;
            }
        } else if self.config.settle_secs > 0.0 {
            thread::sleep(Duration::from_secs_f32(self.config.settle_secs));
        }
        Ok(())
    }

    /// Blocks until the camera has delivered a frame.
    fn wait_for_frame(&mut self) -> Result<CameraObs> {
        let start = Instant::now();
        let timeout = self.config.frame_timeout_secs.map(Duration::from_secs_f32);
        let poll = Duration::from_millis(self.config.frame_poll_ms);

        loop {
            if let Some(obs) = self.frames.latest() {
                return Ok((*obs).clone());
            }
            if let Some(timeout) = timeout {
                if start.elapsed() > timeout {
                    return Err(SimError::FrameTimeout(timeout).into());
                }
            }
            if self.config.synchronous {
                self.world.tick()?;
            } else {
                thread::sleep(poll);
            }
        }
    }

    fn spawn_sensors(&mut self, vehicle: ActorId) -> Result<ActorId> {
        let camera = self
            .world
            .spawn_actor(&self.camera_bp, &self.config.camera.mount, Some(vehicle))?;
        self.actors.push(camera);

        let frames = self.frames.clone();
        let obs_size = self.config.obs_size;
        self.world.listen(
            camera,
            Box::new(move |data| {
                if let SensorData::Image(raw) = data {
                    match CameraObs::from_raw(&raw, obs_size) {
                        Ok(obs) => frames.publish(obs),
                        Err(e) => warn!("Dropped camera frame {}: {}", raw.frame, e),
                    }
                }
            }),
        )?;
        Ok(camera)
    }

    fn spawn_collision_sensor(&mut self, vehicle: ActorId) -> Result<()> {
        let sensor =
            self.world
                .spawn_actor(&self.collision_bp, &Transform::default(), Some(vehicle))?;
        self.actors.push(sensor);

        let collisions = self.collisions.clone();
        self.world.listen(
            sensor,
            Box::new(move |data| {
                if let SensorData::Collision(event) = data {
                    collisions.push(event);
                }
            }),
        )?;
        Ok(())
    }

    fn dump_frame(&self, obs: &CameraObs) {
        if let Some(dir) = &self.config.frame_dump_dir {
            let path = dir.join(format!("{:05}_{:05}.png", self.n_episodes, self.n_steps));
            let result = std::fs::create_dir_all(dir)
                .map_err(anyhow::Error::from)
                .and_then(|_| obs.save_png(&path));
            if let Err(e) = result {
                warn!("Failed to write frame to {:?}: {}", path, e);
            }
        }
    }
}

impl<C: Client> Env for CarEnv<C> {
    type Config = CarEnvConfig<C::Config>;
    type Obs = CameraObs;
    type Act = SteerAct;
    type Info = ();

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        let client = C::connect(&config.client)?;
        Self::from_client(client, config, seed)
    }

    fn reset(&mut self) -> Result<CameraObs> {
        self.release_actors();
        // Callbacks of released sensors may still run on a simulator thread.
        // They keep writing into the slots of the previous episode.
        self.frames = FrameSlot::new();
        self.collisions = CollisionLog::new();

        let transform = *self
            .spawn_candidates
            .choose(&mut self.rng)
            .ok_or(SimError::NoSpawnPoints)?;
        let vehicle = self.world.spawn_actor(&self.vehicle_bp, &transform, None)?;
        self.actors.push(vehicle);
        self.vehicle = Some(vehicle);
        debug!("Spawned vehicle {:?} at {:?}", vehicle, transform.location);

        self.spawn_sensors(vehicle)?;
        self.world.apply_control(vehicle, &VehicleControl::default())?;
        self.settle()?;
        self.spawn_collision_sensor(vehicle)?;

        let obs = self.wait_for_frame()?;
        self.collisions.clear();
        self.episode_start = Instant::now();
        self.world.apply_control(vehicle, &VehicleControl::default())?;
        self.n_episodes += 1;
        self.n_steps = 0;

        Ok(obs)
    }

    fn reset_with_retry(&mut self, max_attempts: usize) -> Result<CameraObs> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.reset() {
                Ok(obs) => return Ok(obs),
                Err(e) => {
                    let occupied = matches!(
                        e.downcast_ref::<SimError>(),
                        Some(SimError::SpawnCollision(_))
                    );
                    if !occupied || attempt >= max_attempts {
                        return Err(e);
                    }
                    warn!("{}, retrying ({}/{})", e, attempt, max_attempts);
                }
            }
        }
    }

    fn step(&mut self, act: &SteerAct) -> Result<(Step<Self>, Record)> {
        let vehicle = self.vehicle.ok_or(SimError::NoEpisode)?;
        let control = act.control(self.config.throttle, self.config.steer_amount);
        self.world.apply_control(vehicle, &control)?;
        if self.config.synchronous {
            self.world.tick()?;
        }

        let kmh = self.world.velocity(vehicle)?.kmh();
        let outcome = self.config.reward.evaluate(
            !self.collisions.is_empty(),
            kmh,
            self.episode_start.elapsed(),
        );

        // The camera may lag behind the control loop by one tick.
        let obs = (*self.frames.latest().ok_or(SimError::NoEpisode)?).clone();
        self.n_steps += 1;
        self.dump_frame(&obs);

        let record = Record::from_slice(&[
            ("speed_kmh", RecordValue::Scalar(kmh as f32)),
            ("n_collisions", RecordValue::Scalar(self.collisions.len() as f32)),
        ]);
        let step = Step::new(
            obs,
            *act,
            outcome.reward,
            outcome.is_terminated,
            outcome.is_truncated,
            (),
        );

        Ok((step, record))
    }
}

impl<C: Client> Drop for CarEnv<C> {
    fn drop(&mut self) {
        self.release_actors();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        types::{ActorSnapshot, CollisionEvent, Location, RawImage, Vector3D},
        RewardPolicy, SensorCallback,
    };
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };
    use tempdir::TempDir;

    #[derive(Default)]
    struct MockState {
        next_id: u32,
        live: Vec<(ActorId, String)>,
        destroyed: Vec<ActorId>,
        callbacks: HashMap<ActorId, SensorCallback>,

        /// Callbacks of destroyed sensors with their type ids, as a
        /// simulator thread may still hold them.
        retired: Vec<(String, SensorCallback)>,
        controls: Vec<VehicleControl>,
        velocity: Vector3D,
        spawn_failures: usize,
        no_images: bool,
        frame: u64,
    }

    impl MockState {
        fn sensors_of_type(&self, pattern: &str) -> Vec<ActorId> {
            self.live
                .iter()
                .filter(|(_, t)| t.contains(pattern))
                .map(|(id, _)| *id)
                .collect()
        }

        fn fire_collision(&mut self) {
            let frame = self.frame;
            for id in self.sensors_of_type("collision") {
                if let Some(cb) = self.callbacks.get_mut(&id) {
                    cb(SensorData::Collision(CollisionEvent {
                        frame,
                        actor: ActorId(1),
                        other_actor: None,
                        normal_impulse: Vector3D::default(),
                    }));
                }
            }
        }
    }

    #[derive(Clone, Default)]
    struct MockConfig {
        state: Arc<Mutex<MockState>>,
    }

    struct MockClient {
        state: Arc<Mutex<MockState>>,
    }

    struct MockWorld {
        state: Arc<Mutex<MockState>>,
    }

    impl Client for MockClient {
        type Config = MockConfig;
        type World = MockWorld;

        fn connect(config: &MockConfig) -> Result<Self> {
            Ok(Self {
                state: config.state.clone(),
            })
        }

        fn world(&self) -> Result<MockWorld> {
            Ok(MockWorld {
                state: self.state.clone(),
            })
        }
    }

    impl World for MockWorld {
        fn find_blueprint(&self, id: &str) -> Result<Blueprint> {
            Ok(Blueprint::new(id))
        }

        fn filter_blueprints(&self, pattern: &str) -> Vec<Blueprint> {
            vec![Blueprint::new("vehicle.tesla.model3")]
                .into_iter()
                .filter(|bp| bp.matches(pattern))
                .collect()
        }

        fn spawn_points(&self) -> Vec<Transform> {
            vec![Transform::at(0.0, 0.0, 0.0), Transform::at(10.0, 0.0, 0.0)]
        }

        fn spawn_actor(
            &mut self,
            blueprint: &Blueprint,
            transform: &Transform,
            _attach_to: Option<ActorId>,
        ) -> Result<ActorId> {
            let mut state = self.state.lock().unwrap();
            if blueprint.id().starts_with("vehicle.") && state.spawn_failures > 0 {
                state.spawn_failures -= 1;
                return Err(SimError::SpawnCollision(transform.location).into());
            }
            state.next_id += 1;
            let id = ActorId(state.next_id);
            state.live.push((id, blueprint.id().to_string()));
            Ok(id)
        }

        fn apply_control(&mut self, _vehicle: ActorId, control: &VehicleControl) -> Result<()> {
            self.state.lock().unwrap().controls.push(*control);
            Ok(())
        }

        fn velocity(&self, _actor: ActorId) -> Result<Vector3D> {
            Ok(self.state.lock().unwrap().velocity)
        }

        fn transform(&self, _actor: ActorId) -> Result<Transform> {
            Ok(Transform::default())
        }

        fn destroy_actor(&mut self, actor: ActorId) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            let type_id = state
                .live
                .iter()
                .find(|(id, _)| *id == actor)
                .map(|(_, t)| t.clone())
                .unwrap_or_default();
            state.live.retain(|(id, _)| *id != actor);
            if let Some(cb) = state.callbacks.remove(&actor) {
                state.retired.push((type_id, cb));
            }
            state.destroyed.push(actor);
            Ok(())
        }

        fn listen(&mut self, sensor: ActorId, callback: SensorCallback) -> Result<()> {
            self.state.lock().unwrap().callbacks.insert(sensor, callback);
            Ok(())
        }

        fn actors(&self) -> Vec<ActorSnapshot> {
            vec![]
        }

        fn spectator_transform(&self) -> Result<Transform> {
            Ok(Transform::default())
        }

        fn tick(&mut self) -> Result<u64> {
            let mut state = self.state.lock().unwrap();
            state.frame += 1;
            let frame = state.frame;
            if !state.no_images {
                for id in state.sensors_of_type("camera") {
                    if let Some(cb) = state.callbacks.get_mut(&id) {
                        cb(SensorData::Image(RawImage {
                            frame,
                            width: 4,
                            height: 2,
                            raw_data: vec![frame as u8; 32],
                        }));
                    }
                }
            }
            Ok(frame)
        }
    }

    fn config(state: &Arc<Mutex<MockState>>) -> CarEnvConfig<MockConfig> {
        CarEnvConfig::default()
            .client(MockConfig {
                state: state.clone(),
            })
            .synchronous(true)
            .settle(0.0, 2)
            .frame_timeout_secs(Some(1.0))
    }

    #[test]
    fn test_reset_spawns_vehicle_and_sensors() -> Result<()> {
        let state = Arc::new(Mutex::new(MockState::default()));
        let mut env = CarEnv::<MockClient>::build(&config(&state), 42)?;
        let obs = env.reset()?;
        assert_eq!((obs.height(), obs.width()), (2, 4));

        let s = state.lock().unwrap();
        let types: Vec<_> = s.live.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(
            types,
            vec!["vehicle.tesla.model3", "sensor.camera.rgb", "sensor.other.collision"]
        );
        assert_eq!(env.actors().len(), 3);
        assert_eq!(env.vehicle(), Some(ActorId(1)));
        // Zero control before settling and when the episode starts.
        assert_eq!(s.controls, vec![VehicleControl::default(); 2]);
        Ok(())
    }

    #[test]
    fn test_step_rewards() -> Result<()> {
        let state = Arc::new(Mutex::new(MockState::default()));
        let mut env = CarEnv::<MockClient>::build(&config(&state), 42)?;
        env.reset()?;

        state.lock().unwrap().velocity = Vector3D::new(20.0, 0.0, 0.0);
        let (step, record) = env.step(&SteerAct::Left)?;
        assert_eq!(step.reward, 1.0);
        assert!(!step.is_done());
        assert_eq!(record.get_scalar("speed_kmh")?, 72.0);
        assert_eq!(state.lock().unwrap().controls.last().unwrap().steer, -1.0);

        state.lock().unwrap().velocity = Vector3D::new(5.0, 0.0, 0.0);
        let (step, _) = env.step(&SteerAct::Straight)?;
        assert_eq!(step.reward, -1.0);
        assert!(!step.is_done());

        state.lock().unwrap().fire_collision();
        let (step, _) = env.step(&SteerAct::Right)?;
        assert_eq!(step.reward, -200.0);
        assert!(step.is_terminated);
        Ok(())
    }

    #[test]
    fn test_time_budget_truncates() -> Result<()> {
        let state = Arc::new(Mutex::new(MockState::default()));
        let config = config(&state).reward(RewardPolicy::default().seconds_per_episode(0.0));
        let mut env = CarEnv::<MockClient>::build(&config, 42)?;
        env.reset()?;
        thread::sleep(Duration::from_millis(5));
        let (step, _) = env.step(&SteerAct::Straight)?;
        assert!(step.is_truncated && !step.is_terminated);
        Ok(())
    }

    #[test]
    fn test_reset_releases_previous_actors() -> Result<()> {
        let state = Arc::new(Mutex::new(MockState::default()));
        {
            let mut env = CarEnv::<MockClient>::build(&config(&state), 42)?;
            env.reset()?;
            env.reset()?;
            let s = state.lock().unwrap();
            assert_eq!(s.destroyed, vec![ActorId(3), ActorId(2), ActorId(1)]);
            assert_eq!(s.live.len(), 3);
        }
        // Dropping the environment destroys the rest.
        let s = state.lock().unwrap();
        assert!(s.live.is_empty());
        assert_eq!(s.destroyed.len(), 6);
        Ok(())
    }

    #[test]
    fn test_reset_with_retry() -> Result<()> {
        let state = Arc::new(Mutex::new(MockState::default()));
        let mut env = CarEnv::<MockClient>::build(&config(&state), 42)?;

        state.lock().unwrap().spawn_failures = 2;
        assert!(env.reset_with_retry(3).is_ok());

        state.lock().unwrap().spawn_failures = 2;
        let err = env.reset_with_retry(2).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SimError>(),
            Some(SimError::SpawnCollision(Location { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_frame_timeout() -> Result<()> {
        let state = Arc::new(Mutex::new(MockState::default()));
        state.lock().unwrap().no_images = true;
        let config = config(&state).frame_timeout_secs(Some(0.05));
        let mut env = CarEnv::<MockClient>::build(&config, 42)?;
        let err = env.reset().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SimError>(),
            Some(SimError::FrameTimeout(_))
        ));
        Ok(())
    }

    #[test]
    fn test_step_without_episode_fails() -> Result<()> {
        let state = Arc::new(Mutex::new(MockState::default()));
        let mut env = CarEnv::<MockClient>::build(&config(&state), 42)?;
        assert!(env.step(&SteerAct::Straight).is_err());
        Ok(())
    }

    #[test]
    fn test_frame_dump() -> Result<()> {
        let dir = TempDir::new("frame_dump")?;
        let state = Arc::new(Mutex::new(MockState::default()));
        let config = config(&state).frame_dump_dir(dir.path());
        let mut env = CarEnv::<MockClient>::build(&config, 42)?;
        env.reset()?;
        env.step(&SteerAct::Straight)?;
        env.step(&SteerAct::Straight)?;
        assert!(dir.path().join("00001_00001.png").exists());
        assert!(dir.path().join("00001_00002.png").exists());
        Ok(())
    }

    #[test]
    fn test_late_sensor_data_of_previous_episode_is_ignored() -> Result<()> {
        let state = Arc::new(Mutex::new(MockState::default()));
        let mut env = CarEnv::<MockClient>::build(&config(&state), 42)?;
        env.reset()?;
        let first = env.reset()?;

        // Sensors of the first episode deliver after the second reset.
        {
            let mut s = state.lock().unwrap();
            s.no_images = true;
            for (type_id, cb) in s.retired.iter_mut() {
                if type_id.contains("camera") {
                    cb(SensorData::Image(RawImage {
                        frame: 99,
                        width: 4,
                        height: 2,
                        raw_data: vec![255; 32],
                    }));
                } else if type_id.contains("collision") {
                    cb(SensorData::Collision(CollisionEvent {
                        frame: 99,
                        actor: ActorId(1),
                        other_actor: None,
                        normal_impulse: Vector3D::default(),
                    }));
                }
            }
            assert_eq!(s.retired.len(), 2);
        }

        let (step, _) = env.step(&SteerAct::Straight)?;
        assert!(env.collisions().is_empty());
        assert!(!step.is_terminated);
        assert_eq!(step.reward, -1.0);
        assert_ne!(step.obs.view()[[0, 0, 0]], 255);
        assert!(step.obs.shares_frame(&first));
        Ok(())
    }
}
