use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock time source, supplied once at construction. Must be monotonic
/// across calls; the orphanage never calls this concurrently with itself
/// (it is always read under the pool's own mutex), so implementations do not
/// need to be reentrant-safe beyond ordinary `Send + Sync`.
pub trait Clock: Send + Sync {
    /// Seconds since an arbitrary but fixed epoch, monotonically
    /// non-decreasing across calls.
    fn now_secs(&self) -> u64;
}

/// Production clock backed by the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock is after the Unix epoch").as_secs()
    }
}

/// A clock a test can move forward by hand, for exercising expiration and
/// sweep-batching behavior deterministically.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct FakeClock(parking_lot::Mutex<u64>);

#[cfg(any(test, feature = "test-support"))]
impl FakeClock {
    pub fn new(start_secs: u64) -> Self {
        Self(parking_lot::Mutex::new(start_secs))
    }

    pub fn set(&self, secs: u64) {
        *self.0.lock() = secs;
    }

    pub fn advance(&self, delta_secs: u64) {
        *self.0.lock() += delta_secs;
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Clock for FakeClock {
    fn now_secs(&self) -> u64 {
        *self.0.lock()
    }
}
