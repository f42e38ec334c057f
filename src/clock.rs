use std::sync::Mutex;

use chrono::NaiveDateTime;

/// Source of "now" for every time-driven decision in the engine.
///
/// Injected so reconciliation is deterministic under test; production code
/// uses [`SystemClock`].
pub trait TimeSource: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in local civil time.
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// A clock pinned to an explicit instant. Advance it with [`FixedClock::set`].
pub struct FixedClock(Mutex<NaiveDateTime>);

impl FixedClock {
    pub fn new(at: NaiveDateTime) -> Self {
        Self(Mutex::new(at))
    }

    pub fn set(&self, at: NaiveDateTime) {
        *self.0.lock().unwrap() = at;
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}
