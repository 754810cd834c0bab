//! Timestamp of the last finished trigger cycle.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Shared `lastRun` value, stored as Unix seconds (0 = never).
///
/// Clones share the same value. Lives for the process only.
#[derive(Debug, Clone, Default)]
pub struct LastRun(Arc<AtomicI64>);

impl LastRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished cycle.
    pub fn record(&self, at: DateTime<Utc>) {
        self.0.store(at.timestamp(), Ordering::SeqCst);
    }

    /// Raw Unix seconds; 0 if no cycle has finished.
    pub fn unix_seconds(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Time of the last finished cycle, `None` if never run.
    pub fn get(&self) -> Option<DateTime<Utc>> {
        match self.unix_seconds() {
            0 => None,
            secs => DateTime::from_timestamp(secs, 0),
        }
    }
}
