//! Shared slots written by sensor callbacks and read by the control loop.
use crate::{obs::CameraObs, types::CollisionEvent};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking writer cannot leave the slot half-written, so the data is
    // still usable after poisoning.
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Single-slot mailbox holding the newest value.
///
/// Publishing overwrites the previous value. Clones share the slot.
#[derive(Debug)]
pub struct Mailbox<T> {
    slot: Arc<Mutex<Option<Arc<T>>>>,
    n_published: Arc<AtomicU64>,
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            n_published: self.n_published.clone(),
        }
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            n_published: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, value: T) {
        *lock(&self.slot) = Some(Arc::new(value));
        self.n_published.fetch_add(1, Ordering::Release);
    }

    /// The newest value, if any.
    pub fn latest(&self) -> Option<Arc<T>> {
        lock(&self.slot).clone()
    }

    pub fn clear(&self) {
        *lock(&self.slot) = None;
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.slot).is_none()
    }

    /// Total number of values published since construction.
    pub fn n_published(&self) -> u64 {
        self.n_published.load(Ordering::Acquire)
    }
}

/// Mailbox of camera frames.
pub type FrameSlot = Mailbox<CameraObs>;

/// Append-only log of collision events, cleared at the start of an episode.
#[derive(Clone, Debug, Default)]
pub struct CollisionLog {
    events: Arc<Mutex<Vec<CollisionEvent>>>,
}

impl CollisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: CollisionEvent) {
        lock(&self.events).push(event);
    }

    pub fn len(&self) -> usize {
        lock(&self.events).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.events).is_empty()
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
    }

    /// Copy of the logged events.
    pub fn events(&self) -> Vec<CollisionEvent> {
        lock(&self.events).clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{ActorId, Vector3D};
    use std::thread;

    #[test]
    fn test_mailbox_keeps_newest() {
        let mailbox = Mailbox::new();
        assert!(mailbox.latest().is_none());

        let writer = mailbox.clone();
        let handle = thread::spawn(move || {
            for i in 0..100 {
                writer.publish(i);
            }
        });
        handle.join().unwrap();

        assert_eq!(*mailbox.latest().unwrap(), 99);
        assert_eq!(mailbox.n_published(), 100);

        mailbox.clear();
        assert!(mailbox.is_empty());
        assert_eq!(mailbox.n_published(), 100);
    }

    #[test]
    fn test_collision_log() {
        let log = CollisionLog::new();
        let sensor_side = log.clone();
        sensor_side.push(CollisionEvent {
            frame: 1,
            actor: ActorId(1),
            other_actor: None,
            normal_impulse: Vector3D::default(),
        });
        assert_eq!(log.len(), 1);
        assert_eq!(log.events()[0].frame, 1);
        log.clear();
        assert!(sensor_side.is_empty());
    }
}
