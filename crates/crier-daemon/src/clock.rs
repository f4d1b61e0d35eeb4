use chrono::{DateTime, Utc};

/// Source of "now" for the engine.
///
/// The tick loop never calls `Utc::now()` directly — time comes through
/// this seam so tests can drive the multi-tick scenarios deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
