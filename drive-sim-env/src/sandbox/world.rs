//! In-process world of the sandbox simulator.
use super::{config::SandboxConfig, render::render};
use crate::{
    error::SimError,
    mailbox::lock,
    types::{
        match_type_id, ActorId, ActorSnapshot, Blueprint, CollisionEvent, Location, Rotation,
        SensorData, Transform, Vector3D, VehicleControl,
    },
    SensorCallback, World,
};
use anyhow::{bail, Result};
use log::{debug, info};
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

type SharedCallback = Arc<Mutex<SensorCallback>>;

/// Sensor output waiting to be passed to its callback.
type Delivery = (SharedCallback, SensorData);

enum ActorKind {
    Vehicle { speed: f32, control: VehicleControl },
    Camera { width: u32, height: u32 },
    CollisionSensor,
    Static,
}

struct SandboxActor {
    type_id: String,

    /// Relative to the parent if attached.
    transform: Transform,
    parent: Option<ActorId>,
    kind: ActorKind,
    callback: Option<SharedCallback>,
}

fn blueprint_library() -> Vec<Blueprint> {
    vec![
        Blueprint::new("vehicle.tesla.model3"),
        Blueprint::new("vehicle.audi.tt"),
        Blueprint::new("vehicle.lincoln.mkz_2017"),
        Blueprint::new("sensor.camera.rgb")
            .with_attribute("image_size_x", 800)
            .with_attribute("image_size_y", 600)
            .with_attribute("fov", 90.0),
        Blueprint::new("sensor.other.collision"),
        Blueprint::new("static.prop.streetbarrier"),
        Blueprint::new("traffic.traffic_light"),
    ]
}

struct SandboxState {
    config: SandboxConfig,
    frame: u64,
    next_id: u32,
    actors: BTreeMap<ActorId, SandboxActor>,
    blueprints: Vec<Blueprint>,
    spawn_points: Vec<Transform>,
}

impl SandboxState {
    fn new(config: SandboxConfig) -> Self {
        let center = config.center_radius();
        let clearance = config.physics.radius;
        let spawn_points = (0..config.n_spawn_points)
            .map(|i| {
                let deg = 360.0 * i as f32 / config.n_spawn_points as f32;
                let (sin, cos) = deg.to_radians().sin_cos();
                Transform::new(
                    Location::new(center * cos, center * sin, 0.5),
                    Rotation::new(0.0, deg + 90.0, 0.0),
                )
            })
            .filter(|t| {
                config.obstacles.iter().all(|o| {
                    t.location.distance_2d(&Location::new(o.x, o.y, 0.0)) >= o.radius + clearance
                })
            })
            .collect();

        let mut state = Self {
            frame: 0,
            next_id: 0,
            actors: BTreeMap::new(),
            blueprints: blueprint_library(),
            spawn_points,
            config,
        };

        let r = state.config.road_outer_radius + 2.0;
        let n = state.config.n_traffic_lights;
        for i in 0..n {
            let deg = 45.0 + 360.0 * i as f32 / n as f32;
            let (sin, cos) = deg.to_radians().sin_cos();
            state.insert(SandboxActor {
                type_id: "traffic.traffic_light".to_string(),
                transform: Transform::at(r * cos, r * sin, 0.0),
                parent: None,
                kind: ActorKind::Static,
                callback: None,
            });
        }
        state
    }

    fn insert(&mut self, actor: SandboxActor) -> ActorId {
        self.next_id += 1;
        let id = ActorId(self.next_id);
        self.actors.insert(id, actor);
        id
    }

    fn get(&self, id: ActorId) -> Result<&SandboxActor, SimError> {
        self.actors.get(&id).ok_or(SimError::ActorNotFound(id))
    }

    /// Transform in world coordinates, `None` if the actor or one of its
    /// ancestors is gone.
    fn world_transform(&self, id: ActorId) -> Option<Transform> {
        let actor = self.actors.get(&id)?;
        match actor.parent {
            None => Some(actor.transform),
            Some(parent) => Some(self.world_transform(parent)?.compose(&actor.transform)),
        }
    }

    fn vehicle_locations(&self) -> Vec<(ActorId, Location)> {
        self.actors
            .iter()
            .filter(|(_, a)| matches!(a.kind, ActorKind::Vehicle { .. }))
            .map(|(id, a)| (*id, a.transform.location))
            .collect()
    }

    /// Returns `Some(other)` if a vehicle at `location` touches the road
    /// boundary or an obstacle (`other = None`) or another vehicle.
    fn contact(&self, id: ActorId, location: &Location) -> Option<Option<ActorId>> {
        let c = &self.config;
        let radius = c.physics.radius;
        let r = (location.x.powi(2) + location.y.powi(2)).sqrt();
        if r - radius < c.road_inner_radius || r + radius > c.road_outer_radius {
            return Some(None);
        }
        let hits_obstacle = c.obstacles.iter().any(|o| {
            location.distance_2d(&Location::new(o.x, o.y, 0.0)) < o.radius + radius
        });
        if hits_obstacle {
            return Some(None);
        }
        self.vehicle_locations()
            .into_iter()
            .find(|(other, l)| *other != id && location.distance_2d(l) < 2.0 * radius)
            .map(|(other, _)| Some(other))
    }

    fn spawn(
        &mut self,
        blueprint: &Blueprint,
        transform: &Transform,
        attach_to: Option<ActorId>,
    ) -> Result<ActorId> {
        if !self.blueprints.iter().any(|bp| bp.id() == blueprint.id()) {
            return Err(SimError::BlueprintNotFound(blueprint.id().to_string()).into());
        }
        if let Some(parent) = attach_to {
            self.get(parent)?;
        }

        let id = blueprint.id();
        let kind = if match_type_id(id, "vehicle.*") {
            let location = match attach_to {
                None => transform.location,
                Some(parent) => self
                    .world_transform(parent)
                    .ok_or(SimError::ActorNotFound(parent))?
                    .compose(transform)
                    .location,
            };
            let c = &self.config;
            let blocked = c.obstacles.iter().any(|o| {
                location.distance_2d(&Location::new(o.x, o.y, 0.0)) < o.radius + c.physics.radius
            }) || self
                .vehicle_locations()
                .iter()
                .any(|(_, l)| location.distance_2d(l) < c.spawn_clearance);
            if blocked {
                return Err(SimError::SpawnCollision(location).into());
            }
            ActorKind::Vehicle {
                speed: 0.0,
                control: VehicleControl::default(),
            }
        } else if id == "sensor.camera.rgb" {
            ActorKind::Camera {
                width: blueprint.parse_attribute("image_size_x")?.unwrap_or(800),
                height: blueprint.parse_attribute("image_size_y")?.unwrap_or(600),
            }
        } else if id == "sensor.other.collision" {
            ActorKind::CollisionSensor
        } else {
            ActorKind::Static
        };

        let actor_id = self.insert(SandboxActor {
            type_id: id.to_string(),
            transform: *transform,
            parent: attach_to,
            kind,
            callback: None,
        });
        debug!("Spawned {} as {:?}", id, actor_id);
        Ok(actor_id)
    }

    /// Advances the world by `dt` seconds and returns sensor output.
    fn step(&mut self, dt: f32) -> Vec<Delivery> {
        self.frame += 1;
        let p = self.config.physics.clone();

        for actor in self.actors.values_mut() {
            if let ActorKind::Vehicle { speed, control } = &mut actor.kind {
                let throttle = control.throttle.clamp(0.0, 1.0);
                let brake = control.brake.clamp(0.0, 1.0);
                let steer = control.steer.clamp(-1.0, 1.0);

                let accel = throttle * p.max_accel - brake * p.max_brake - p.drag * *speed * *speed;
                *speed = (*speed + accel * dt).max(0.0);

                let t = &mut actor.transform;
                let delta = (steer * p.max_steer_deg).to_radians();
                let yaw = t.rotation.yaw.to_radians() + *speed / p.wheelbase * delta.tan() * dt;
                let (sin, cos) = yaw.sin_cos();
                t.location.x += *speed * cos * dt;
                t.location.y += *speed * sin * dt;
                t.rotation.yaw = (yaw.to_degrees() + 180.0).rem_euclid(360.0) - 180.0;
            }
        }

        let mut deliveries = Vec::new();

        let contacts: Vec<(ActorId, Option<ActorId>)> = self
            .vehicle_locations()
            .into_iter()
            .filter_map(|(id, l)| self.contact(id, &l).map(|other| (id, other)))
            .collect();
        for (vehicle, other_actor) in contacts {
            if let Some(SandboxActor {
                kind: ActorKind::Vehicle { speed, .. },
                ..
            }) = self.actors.get_mut(&vehicle)
            {
                *speed = 0.0;
            }
            for actor in self.actors.values() {
                if let (ActorKind::CollisionSensor, Some(cb), Some(parent)) =
                    (&actor.kind, &actor.callback, actor.parent)
                {
                    if parent == vehicle {
                        let event = CollisionEvent {
                            frame: self.frame,
                            actor: vehicle,
                            other_actor,
                            normal_impulse: Vector3D::new(0.0, 0.0, 1.0),
                        };
                        deliveries.push((cb.clone(), SensorData::Collision(event)));
                    }
                }
            }
        }

        for (id, actor) in self.actors.iter() {
            if let (ActorKind::Camera { width, height }, Some(cb)) = (&actor.kind, &actor.callback)
            {
                let camera = match self.world_transform(*id) {
                    Some(t) => t,
                    None => continue,
                };
                let others: Vec<Location> = self
                    .vehicle_locations()
                    .into_iter()
                    .filter(|(v, _)| Some(*v) != actor.parent)
                    .map(|(_, l)| l)
                    .collect();
                let image = render(&self.config, &others, &camera, *width, *height, self.frame);
                deliveries.push((cb.clone(), SensorData::Image(image)));
            }
        }

        deliveries
    }
}

fn deliver(deliveries: Vec<Delivery>) {
    for (callback, data) in deliveries {
        let mut callback = lock(&callback);
        (*callback)(data);
    }
}

/// Server thread advancing an asynchronous world.
struct ServerThread {
    stop: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ServerThread {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = lock(&self.handle).take() {
            if handle.join().is_err() {
                log::error!("Sandbox server thread panicked");
            }
        }
    }
}

/// World of the sandbox simulator.
///
/// Clones are handles to the same world. The server thread of an
/// asynchronous world stops when the last handle is dropped.
#[derive(Clone)]
pub struct SandboxWorld {
    state: Arc<Mutex<SandboxState>>,
    server: Option<Arc<ServerThread>>,
}

impl SandboxWorld {
    pub fn new(config: SandboxConfig) -> Result<Self> {
        if config.tick_hz <= 0.0 {
            bail!("tick_hz must be positive, got {}", config.tick_hz);
        }
        if config.road_inner_radius >= config.road_outer_radius {
            bail!(
                "Inner radius {} of the road must be less than the outer radius {}",
                config.road_inner_radius,
                config.road_outer_radius
            );
        }

        let synchronous = config.synchronous;
        let period = Duration::from_secs_f32(1.0 / config.tick_hz);
        let state = Arc::new(Mutex::new(SandboxState::new(config)));

        let server = if synchronous {
            None
        } else {
            let stop = Arc::new(AtomicBool::new(false));
            let handle = {
                let state = state.clone();
                let stop = stop.clone();
                thread::Builder::new()
                    .name("sandbox-server".to_string())
                    .spawn(move || {
                        let mut next = Instant::now();
                        while !stop.load(Ordering::Acquire) {
                            next += period;
                            let deliveries = lock(&state).step(period.as_secs_f32());
                            deliver(deliveries);
                            match next.checked_duration_since(Instant::now()) {
                                Some(wait) => thread::sleep(wait),
                                None => next = Instant::now(),
                            }
                        }
                    })?
            };
            info!("Started sandbox server at {} Hz", 1.0 / period.as_secs_f32());
            Some(Arc::new(ServerThread {
                stop,
                handle: Mutex::new(Some(handle)),
            }))
        };

        Ok(Self { state, server })
    }

    pub fn is_synchronous(&self) -> bool {
        self.server.is_none()
    }

    /// Current frame number.
    pub fn frame(&self) -> u64 {
        lock(&self.state).frame
    }
}

impl World for SandboxWorld {
    fn find_blueprint(&self, id: &str) -> Result<Blueprint> {
        lock(&self.state)
            .blueprints
            .iter()
            .find(|bp| bp.id() == id)
            .cloned()
            .ok_or_else(|| SimError::BlueprintNotFound(id.to_string()).into())
    }

    fn filter_blueprints(&self, pattern: &str) -> Vec<Blueprint> {
        lock(&self.state)
            .blueprints
            .iter()
            .filter(|bp| bp.matches(pattern))
            .cloned()
            .collect()
    }

    fn spawn_points(&self) -> Vec<Transform> {
        lock(&self.state).spawn_points.clone()
    }

    fn spawn_actor(
        &mut self,
        blueprint: &Blueprint,
        transform: &Transform,
        attach_to: Option<ActorId>,
    ) -> Result<ActorId> {
        lock(&self.state).spawn(blueprint, transform, attach_to)
    }

    fn apply_control(&mut self, vehicle: ActorId, control: &VehicleControl) -> Result<()> {
        let mut state = lock(&self.state);
        match state.actors.get_mut(&vehicle) {
            Some(SandboxActor {
                kind: ActorKind::Vehicle { control: c, .. },
                ..
            }) => {
                *c = *control;
                Ok(())
            }
            Some(_) => Err(SimError::NotAVehicle(vehicle).into()),
            None => Err(SimError::ActorNotFound(vehicle).into()),
        }
    }

    fn velocity(&self, actor: ActorId) -> Result<Vector3D> {
        let state = lock(&self.state);
        let a = state.get(actor)?;
        Ok(match a.kind {
            ActorKind::Vehicle { speed, .. } => {
                let (sin, cos) = a.transform.rotation.yaw.to_radians().sin_cos();
                Vector3D::new(speed * cos, speed * sin, 0.0)
            }
            _ => Vector3D::default(),
        })
    }

    fn transform(&self, actor: ActorId) -> Result<Transform> {
        let state = lock(&self.state);
        state
            .world_transform(actor)
            .ok_or_else(|| SimError::ActorNotFound(actor).into())
    }

    fn destroy_actor(&mut self, actor: ActorId) -> Result<()> {
        match lock(&self.state).actors.remove(&actor) {
            Some(a) => {
                debug!("Destroyed {} {:?}", a.type_id, actor);
                Ok(())
            }
            None => Err(SimError::ActorNotFound(actor).into()),
        }
    }

    fn listen(&mut self, sensor: ActorId, callback: SensorCallback) -> Result<()> {
        let mut state = lock(&self.state);
        let actor = state
            .actors
            .get_mut(&sensor)
            .ok_or(SimError::ActorNotFound(sensor))?;
        match actor.kind {
            ActorKind::Camera { .. } | ActorKind::CollisionSensor => {
                actor.callback = Some(Arc::new(Mutex::new(callback)));
                Ok(())
            }
            _ => Err(SimError::NotASensor(sensor).into()),
        }
    }

    fn actors(&self) -> Vec<ActorSnapshot> {
        let state = lock(&self.state);
        state
            .actors
            .iter()
            .map(|(id, a)| ActorSnapshot {
                id: *id,
                type_id: a.type_id.clone(),
                transform: state.world_transform(*id).unwrap_or(a.transform),
                parent: a.parent,
            })
            .collect()
    }

    fn spectator_transform(&self) -> Result<Transform> {
        Ok(Transform::new(
            Location::new(0.0, 0.0, 120.0),
            Rotation::new(-90.0, 0.0, 0.0),
        ))
    }

    fn tick(&mut self) -> Result<u64> {
        if self.server.is_some() {
            return Ok(self.frame());
        }
        let (deliveries, frame) = {
            let mut state = lock(&self.state);
            let dt = 1.0 / state.config.tick_hz;
            (state.step(dt), state.frame)
        };
        deliver(deliveries);
        Ok(frame)
    }
}
