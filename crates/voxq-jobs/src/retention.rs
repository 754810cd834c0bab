//! Time-based deletion of completed jobs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};

use voxq_core::{JobStore, Result};

/// Which completed jobs the sweep removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionPolicy {
    pub delete_completed: bool,
    /// Seconds after completion; 0 deletes on the next sweep.
    pub delete_completed_after: u64,
}

impl RetentionPolicy {
    pub fn new(delete_completed: bool, delete_completed_after: u64) -> Self {
        Self {
            delete_completed,
            delete_completed_after,
        }
    }

    /// Policy that never deletes.
    pub fn keep_all() -> Self {
        Self::new(false, 0)
    }

    /// Latest `completed_at` still old enough to delete at `now`.
    ///
    /// `None` when the policy is off or the age reaches before the epoch.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.delete_completed {
            return None;
        }
        let age = i64::try_from(self.delete_completed_after)
            .ok()
            .and_then(chrono::Duration::try_seconds)?;
        now.checked_sub_signed(age)
    }

    /// Operator-facing summary.
    pub fn describe(&self) -> String {
        match (self.delete_completed, self.delete_completed_after) {
            (false, _) => "Completed jobs are not deleted".to_string(),
            (true, 0) => "Completed jobs are deleted immediately".to_string(),
            (true, secs) => format!("Completed jobs are deleted after {secs} seconds"),
        }
    }
}

/// Result of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub deleted: u64,
}

/// Deletes completed jobs older than the policy allows.
#[derive(Clone)]
pub struct RetentionSweeper {
    store: Arc<dyn JobStore>,
    policy: RetentionPolicy,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn JobStore>, policy: RetentionPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(Utc::now()).await
    }

    /// Delete every completed job with `now - completed_at >= delete_completed_after`.
    #[instrument(skip(self), fields(subsystem = "jobs", component = "sweeper", op = "sweep"))]
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let Some(cutoff) = self.policy.cutoff(now) else {
            debug!(policy = %self.policy.describe(), "Retention sweep skipped");
            return Ok(SweepReport::default());
        };

        let deleted = self.store.delete_completed_before(cutoff).await?;
        if deleted > 0 {
            info!(deleted, %cutoff, "Retention sweep removed completed jobs");
        } else {
            debug!(%cutoff, "Retention sweep found nothing to remove");
        }
        Ok(SweepReport { deleted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            RetentionPolicy::new(true, 0).describe(),
            "Completed jobs are deleted immediately"
        );
        assert_eq!(
            RetentionPolicy::new(true, 3600).describe(),
            "Completed jobs are deleted after 3600 seconds"
        );
        assert_eq!(
            RetentionPolicy::keep_all().describe(),
            "Completed jobs are not deleted"
        );
    }

    #[test]
    fn test_cutoff() {
        let now = at(1_000_000);
        assert_eq!(RetentionPolicy::new(true, 0).cutoff(now), Some(now));
        assert_eq!(RetentionPolicy::new(true, 60).cutoff(now), Some(at(999_940)));
        assert_eq!(RetentionPolicy::new(false, 60).cutoff(now), None);
    }

    #[test]
    fn test_cutoff_with_huge_age() {
        assert_eq!(RetentionPolicy::new(true, u64::MAX).cutoff(at(0)), None);
    }
}
