//! Wall-clock abstraction so retention and grouping can be tested

use chrono::{DateTime, TimeZone, Utc};
use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};

/// Milliseconds in one day
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Source of the current time
pub trait Clock: Send + Sync + Debug {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Current instant as epoch milliseconds
    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Real time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests and replays
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Clock fixed at `millis`
    #[must_use]
    pub fn at_millis(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Clock fixed at `instant`
    #[must_use]
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self::at_millis(instant.timestamp_millis())
    }

    /// Move the clock to `millis`
    pub fn set_millis(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    /// Advance by `delta_ms`
    pub fn advance_ms(&self, delta_ms: i64) {
        self.millis.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.load(Ordering::SeqCst);
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    fn now_ms(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}
