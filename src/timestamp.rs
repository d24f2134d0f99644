use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Absolute point in time, in whole seconds since the Unix epoch.
///
/// Contract time boundaries (`Timebound`) are expressed in the same unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    pub fn as_secs(self) -> i64 {
        self.0
    }

    /// True when `bound` (seconds since epoch) lies strictly before this instant.
    pub fn is_after(self, bound: i64) -> bool {
        bound < self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(time: DateTime<Utc>) -> Self {
        Self(time.timestamp())
    }
}

impl From<Timestamp> for Option<DateTime<Utc>> {
    fn from(timestamp: Timestamp) -> Self {
        Utc.timestamp_opt(timestamp.0, 0).single()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of "now" for time-dependent combinators.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock pinned to a single instant. Useful for reproducible valuations.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}
