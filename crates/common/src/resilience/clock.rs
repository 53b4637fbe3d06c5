//! Time sources.
//!
//! Components that make expiry or timeout decisions take a [`Clock`] so tests
//! can move time forward without sleeping.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Abstraction over monotonic and wall-clock time.
pub trait Clock: Send + Sync + 'static {
    /// Monotonic instant, used for TTLs and elapsed-time measurements.
    fn now(&self) -> Instant;

    /// Wall-clock time, used for credential expiry.
    fn utc_now(&self) -> DateTime<Utc>;
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Shared, type-erased clock handle.
pub type SharedClock = Arc<dyn Clock>;

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        (**self).utc_now()
    }
}

/// Mock clock for deterministic testing
///
/// Both the monotonic and the wall-clock readings advance together.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    start_utc: DateTime<Utc>,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Mock clock whose wall-clock reading starts at `start_utc`.
    pub fn starting_at(start_utc: DateTime<Utc>) -> Self {
        Self { start: Instant::now(), start_utc, elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner) += duration;
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }

    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.elapsed()).unwrap_or(chrono::Duration::MAX);
        self.start_utc + elapsed
    }
}
