//! Queue configuration.

use std::time::Duration;

use voxq_core::defaults::{
    CRON_PARALLEL_CALLS, CRON_PARALLEL_CALLS_MAX, CRON_SCHEDULE_SECS, DELETE_COMPLETED,
    DELETE_COMPLETED_AFTER_SECS, STALE_CLAIM_SECS, SYNTH_TIMEOUT_SECS,
};

use crate::retention::RetentionPolicy;

/// Configuration for the trigger, runner and retention sweep.
///
/// The synthesis endpoint and key are read by the client's own config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Schedule period in seconds. 0 disables the schedule.
    pub interval_seconds: u64,
    /// Jobs per firing. 0 selects every waiting job.
    pub parallel_calls: usize,
    /// Upper bound on a single synthesis call in seconds.
    pub synthesis_timeout_secs: u64,
    /// Whether the sweep deletes completed jobs at all.
    pub delete_completed: bool,
    /// Age in seconds after which a completed job is swept.
    pub delete_completed_after: u64,
    /// Age in seconds after which a processing claim is treated as orphaned.
    pub stale_claim_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            interval_seconds: CRON_SCHEDULE_SECS,
            parallel_calls: CRON_PARALLEL_CALLS,
            synthesis_timeout_secs: SYNTH_TIMEOUT_SECS,
            delete_completed: DELETE_COMPLETED,
            delete_completed_after: DELETE_COMPLETED_AFTER_SECS,
            stale_claim_secs: STALE_CLAIM_SECS,
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `CRON_SCHEDULE` | `300` | Seconds between scheduled firings (0 = off) |
    /// | `CRON_PARALLEL_CALLS` | `3` | Jobs per firing (0 = all, max 1000) |
    /// | `SYNTH_TIMEOUT_SECS` | `60` | Timeout of one synthesis call |
    /// | `DELETE_COMPLETED` | `true` | Sweep completed jobs |
    /// | `DELETE_COMPLETED_AFTER` | `86400` | Seconds before a completed job is swept |
    /// | `STALE_CLAIM_SECS` | `600` | Seconds before a processing job counts as orphaned |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parse_u64 = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        let parallel_calls = lookup("CRON_PARALLEL_CALLS")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(CRON_PARALLEL_CALLS);

        let delete_completed = lookup("DELETE_COMPLETED")
            .map(|v| {
                let v = v.trim();
                v != "false" && v != "0"
            })
            .unwrap_or(DELETE_COMPLETED);

        Self::default()
            .with_interval(parse_u64("CRON_SCHEDULE", CRON_SCHEDULE_SECS))
            .with_parallel_calls(parallel_calls)
            .with_synthesis_timeout(parse_u64("SYNTH_TIMEOUT_SECS", SYNTH_TIMEOUT_SECS))
            .with_delete_completed(delete_completed)
            .with_delete_completed_after(parse_u64(
                "DELETE_COMPLETED_AFTER",
                DELETE_COMPLETED_AFTER_SECS,
            ))
            .with_stale_claim_after(parse_u64("STALE_CLAIM_SECS", STALE_CLAIM_SECS))
    }

    pub fn with_interval(mut self, seconds: u64) -> Self {
        self.interval_seconds = seconds;
        self
    }

    /// Set jobs per firing, clamped to `0..=1000`.
    pub fn with_parallel_calls(mut self, calls: usize) -> Self {
        self.parallel_calls = calls.min(CRON_PARALLEL_CALLS_MAX);
        self
    }

    /// Set the synthesis timeout (at least one second).
    pub fn with_synthesis_timeout(mut self, seconds: u64) -> Self {
        self.synthesis_timeout_secs = seconds.max(1);
        self
    }

    pub fn with_delete_completed(mut self, enabled: bool) -> Self {
        self.delete_completed = enabled;
        self
    }

    pub fn with_delete_completed_after(mut self, seconds: u64) -> Self {
        self.delete_completed_after = seconds;
        self
    }

    pub fn with_stale_claim_after(mut self, seconds: u64) -> Self {
        self.stale_claim_secs = seconds;
        self
    }

    /// Claim age after which startup recovery may requeue a processing job.
    ///
    /// Never shorter than the synthesis timeout, so a claim held by a live
    /// worker in the middle of a call is not taken over.
    pub fn stale_claim_after(&self) -> Duration {
        Duration::from_secs(self.stale_claim_secs.max(self.synthesis_timeout_secs))
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy::new(self.delete_completed, self.delete_completed_after)
    }
}
