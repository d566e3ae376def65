use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

/// Monotonic time base shared by scheduling and judging.
pub trait Clock: Send + Sync {
    /// Seconds since the clock's epoch, or `None` when the source is
    /// unavailable.
    fn now(&self) -> Option<f64>;
}

/// Wall clock backed by [`Instant`], with its epoch fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Option<f64> {
        Some(self.epoch.elapsed().as_secs_f64())
    }
}

/// Manually driven clock for tests and offline simulation. Clones share the
/// same time value.
#[derive(Debug, Clone)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
    available: Arc<AtomicBool>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(start.to_bits())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set(&self, seconds: f64) {
        self.bits.store(seconds.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, delta: f64) {
        let current = f64::from_bits(self.bits.load(Ordering::SeqCst));
        self.set(current + delta);
    }

    /// Simulates the underlying source going away.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Option<f64> {
        self.available
            .load(Ordering::SeqCst)
            .then(|| f64::from_bits(self.bits.load(Ordering::SeqCst)))
    }
}
