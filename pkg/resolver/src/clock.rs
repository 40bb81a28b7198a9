use std::fmt;

use chrono::{DateTime, Utc};

/// Source of the current time for rotation decisions.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Instant on a fixed date with the given minute of the hour; handy for
    /// exercising rotation windows.
    pub fn at_minute(minute: u32) -> Option<Self> {
        use chrono::TimeZone;

        Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0)
            .single()
            .map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
