//! In-flight entry and busy-change notification types.

use std::time::{Duration, Instant};

use super::OperationKey;

/// Registry record marking a key as busy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightEntry {
    pub key: OperationKey,
    /// Attempt currently running (1 = first attempt).
    pub attempt: u32,
    pub started_at: Instant,
}

impl InFlightEntry {
    pub(super) fn new(key: OperationKey) -> Self {
        Self {
            key,
            attempt: 1,
            started_at: Instant::now(),
        }
    }

    /// Time since the key became busy, across all attempts.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// A key switched between idle and busy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusyChange {
    pub key: OperationKey,
    pub busy: bool,
}
