//! Plain value types exchanged with a driving simulator.
use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, str::FromStr};

/// Position in meters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Location {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Location {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance on the ground plane.
    pub fn distance_2d(&self, other: &Location) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Orientation in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Rotation {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Rotation {
    pub fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Transform {
    pub location: Location,
    pub rotation: Rotation,
}

impl Transform {
    pub fn new(location: Location, rotation: Rotation) -> Self {
        Self { location, rotation }
    }

    /// Transform at the given location without rotation.
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self::new(Location::new(x, y, z), Rotation::default())
    }

    /// Composes a transform given relative to `self` into world coordinates.
    ///
    /// Only yaw is taken into account, which is sufficient for actors
    /// attached to ground vehicles.
    pub fn compose(&self, relative: &Transform) -> Transform {
        let (sin, cos) = self.rotation.yaw.to_radians().sin_cos();
        let rl = &relative.location;
        let location = Location::new(
            self.location.x + rl.x * cos - rl.y * sin,
            self.location.y + rl.x * sin + rl.y * cos,
            self.location.z + rl.z,
        );
        let rotation = Rotation::new(
            self.rotation.pitch + relative.rotation.pitch,
            self.rotation.yaw + relative.rotation.yaw,
            self.rotation.roll + relative.rotation.roll,
        );
        Transform::new(location, rotation)
    }
}

/// Velocity in meters per second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Vector3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3D {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Speed in km/h, truncated to an integer.
    pub fn kmh(&self) -> u32 {
        (3.6 * self.length()) as u32
    }
}

/// Control input of a vehicle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct VehicleControl {
    /// In `[0, 1]`.
    pub throttle: f32,

    /// In `[-1, 1]`, negative is left.
    pub steer: f32,

    /// In `[0, 1]`.
    pub brake: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct ActorId(pub u32);

/// A template from which actors are spawned.
#[derive(Clone, Debug, PartialEq)]
pub struct Blueprint {
    id: String,
    attributes: BTreeMap<String, String>,
}

impl Blueprint {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds an attribute, builder style.
    pub fn with_attribute(mut self, key: &str, value: impl ToString) -> Self {
        self.set_attribute(key, value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_attribute(&mut self, key: &str, value: impl ToString) {
        self.attributes.insert(key.to_string(), value.to_string());
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Parses an attribute, returning `Ok(None)` if it is not set.
    pub fn parse_attribute<T: FromStr>(&self, key: &str) -> Result<Option<T>, SimError> {
        match self.attribute(key) {
            None => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| SimError::InvalidAttribute {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
        }
    }

    /// Returns `true` if the id matches `pattern`.
    ///
    /// A pattern containing `*` is matched as a wildcard over the whole id,
    /// otherwise it matches any id containing it.
    pub fn matches(&self, pattern: &str) -> bool {
        match_type_id(&self.id, pattern)
    }
}

/// Matches an actor or blueprint type id against a pattern.
///
/// See [`Blueprint::matches`].
pub fn match_type_id(id: &str, pattern: &str) -> bool {
    if !pattern.contains('*') {
        return id.contains(pattern);
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let (first, last) = (parts[0], parts[parts.len() - 1]);
    if !id.starts_with(first) || id.len() < first.len() + last.len() || !id.ends_with(last) {
        return false;
    }

    let mut rest = &id[first.len()..id.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(ix) => rest = &rest[ix + part.len()..],
            None => return false,
        }
    }
    true
}

/// State of an actor as reported by [`World::actors`](crate::World::actors).
#[derive(Clone, Debug, PartialEq)]
pub struct ActorSnapshot {
    pub id: ActorId,
    pub type_id: String,

    /// Transform in world coordinates.
    pub transform: Transform,
    pub parent: Option<ActorId>,
}

/// Image delivered by a camera, 4 bytes per pixel in BGRA order.
#[derive(Clone, Debug)]
pub struct RawImage {
    pub frame: u64,
    pub width: u32,
    pub height: u32,
    pub raw_data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CollisionEvent {
    pub frame: u64,

    /// The actor the sensor is attached to.
    pub actor: ActorId,

    /// `None` when colliding with static geometry.
    pub other_actor: Option<ActorId>,
    pub normal_impulse: Vector3D,
}

/// Payload passed to sensor callbacks.
#[derive(Clone, Debug)]
pub enum SensorData {
    Image(RawImage),
    Collision(CollisionEvent),
}
