use chrono::{DateTime, Duration, Utc};

/// Source of "now" for expiry checks.
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch.
    fn now(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        current_timestamp()
    }
}

/// Clock pinned to a single instant, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

pub fn current_datetime() -> DateTime<Utc> {
    Utc::now()
}

pub fn current_datetime_with_offset(seconds: i64) -> DateTime<Utc> {
    current_datetime() + Duration::seconds(seconds)
}

pub fn current_timestamp() -> i64 {
    current_datetime().timestamp()
}

pub fn current_timestamp_with_offset(seconds: i64) -> i64 {
    current_datetime_with_offset(seconds).timestamp()
}
