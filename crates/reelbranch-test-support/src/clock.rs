//! Deterministic `Clock` implementation for tests.

use reelbranch_core::time::{Clock, Timestamp};

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}
