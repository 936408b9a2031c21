//! Time source abstraction.

use chrono::{DateTime, Utc};

/// Instant used for node creation and story play times.
pub type Timestamp = DateTime<Utc>;

/// Abstraction over wall-clock time so session bookkeeping stays testable.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Timestamp;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}
