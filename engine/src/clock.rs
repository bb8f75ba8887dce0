//! Time source and recency comparison.
//!
//! Conflicts are settled by wall-clock `updatedAt` timestamps. The comparison
//! lives here so every collection uses the same tie-break.

use crate::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of "now" for stamping local edits.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Timestamp {
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicU64,
}

impl FixedClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    /// Move the clock forward by `millis`.
    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

/// Does the local copy win against the server copy?
///
/// Ties go to local: the state being saved must not lose its own edit to an
/// identical-looking snapshot.
pub fn local_wins(local: Timestamp, server: Timestamp) -> bool {
    local >= server
}
