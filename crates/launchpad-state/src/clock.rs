//! Time sources for the state store.
//!
//! The store reads the wall clock through [`Clock`] so tests can pin "now".
//! Deploy-event timestamps additionally go through [`MonotonicStamp`],
//! which guarantees strictly increasing microsecond stamps within one store
//! handle even when the wall clock stalls or steps backwards.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock for tests.
#[derive(Debug)]
pub struct ManualClock {
    micros: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            micros: AtomicI64::new(start.timestamp_micros()),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.micros.store(to.timestamp_micros(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let delta = by.num_microseconds().unwrap_or(i64::MAX);
        self.micros.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        from_micros(self.micros.load(Ordering::SeqCst))
    }
}

/// Issues strictly increasing timestamps at microsecond resolution.
#[derive(Clone)]
pub struct MonotonicStamp {
    clock: Arc<dyn Clock>,
    last_micros: Arc<Mutex<i64>>,
}

impl MonotonicStamp {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last_micros: Arc::new(Mutex::new(i64::MIN)),
        }
    }

    /// The underlying wall clock, truncated to microseconds.
    pub fn now(&self) -> DateTime<Utc> {
        from_micros(self.clock.now().timestamp_micros())
    }

    /// Next stamp: the wall clock, or 1µs past the previous stamp if the
    /// wall clock has not moved beyond it.
    pub fn next(&self) -> DateTime<Utc> {
        let wall = self.clock.now().timestamp_micros();
        let mut last = self
            .last_micros
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = if wall > *last { wall } else { *last + 1 };
        *last = next;
        from_micros(next)
    }
}

fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or(DateTime::<Utc>::MIN_UTC)
}
