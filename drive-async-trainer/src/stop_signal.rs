use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cooperative cancellation token shared between threads.
///
/// Clones observe the same flag. Once stopped, a signal cannot be reset.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the holders of this signal to stop.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stop_is_shared_by_clones() {
        let s1 = StopSignal::new();
        let s2 = s1.clone();
        assert!(!s2.is_stopped());

        let h = std::thread::spawn(move || s2.stop());
        h.join().unwrap();
        assert!(s1.is_stopped());
    }
}
