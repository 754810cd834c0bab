//! Manual queue operations, independent of any transport.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use voxq_core::{
    BulkSelector, Error, FieldRef, Job, JobFilter, JobId, JobStore, PageRef, QueueStats, Result,
    SynthesisRequest,
};

use crate::last_run::LastRun;
use crate::retention::RetentionPolicy;
use crate::runner::{JobOutcome, QueueRunner};

/// Snapshot for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    /// `None` if no cycle has finished yet.
    pub last_run: Option<DateTime<Utc>>,
    pub stats: QueueStats,
    /// Human-readable retention policy.
    pub retention: String,
}

/// Command interface over the queue: enqueue, inspect, re-run and delete.
#[derive(Clone)]
pub struct QueueActions {
    runner: QueueRunner,
    last_run: LastRun,
    retention: RetentionPolicy,
}

impl QueueActions {
    pub fn new(runner: QueueRunner, last_run: LastRun, retention: RetentionPolicy) -> Self {
        Self {
            runner,
            last_run,
            retention,
        }
    }

    fn store(&self) -> &Arc<dyn JobStore> {
        self.runner.store()
    }

    /// Validate and queue a new job.
    pub async fn enqueue(
        &self,
        request: SynthesisRequest,
        page_ref: PageRef,
        field_ref: FieldRef,
    ) -> Result<JobId> {
        let id = self.store().enqueue(request, page_ref, field_ref).await?;
        info!(subsystem = "jobs", component = "actions", op = "enqueue", job_id = %id, page_ref = page_ref.0, "Job queued");
        Ok(id)
    }

    pub async fn list(&self, filter: JobFilter) -> Result<Vec<Job>> {
        self.store().list(filter).await
    }

    /// Get a job, `Error::JobNotFound` if unknown.
    pub async fn get(&self, id: JobId) -> Result<Job> {
        self.store().get(id).await?.ok_or(Error::JobNotFound(id))
    }

    /// Return a finished job to waiting and process it right away.
    ///
    /// A waiting job is processed as is. A job currently processing is left
    /// alone and yields `JobOutcome::Skipped`.
    #[instrument(skip(self), fields(subsystem = "jobs", component = "actions", op = "run", job_id = %id))]
    pub async fn run(&self, id: JobId) -> Result<JobOutcome> {
        if self.store().reset_to_waiting(id).await? {
            info!("Job reset to waiting for manual run");
        }
        self.runner.process_job(id).await
    }

    /// Delete one job regardless of status. `false` if it did not exist.
    pub async fn delete(&self, id: JobId) -> Result<bool> {
        let deleted = self.store().delete(id).await?;
        info!(subsystem = "jobs", component = "actions", op = "delete", job_id = %id, deleted, "Job delete requested");
        Ok(deleted)
    }

    /// Delete every job matched by `selector`.
    pub async fn delete_bulk(&self, selector: BulkSelector) -> Result<u64> {
        let deleted = match selector.status() {
            Some(status) => self.store().delete_by_status(status).await?,
            None => self.store().delete_all().await?,
        };
        info!(
            subsystem = "jobs",
            component = "actions",
            op = "delete_bulk",
            selector = selector.as_str(),
            deleted,
            "Bulk delete finished"
        );
        Ok(deleted)
    }

    pub async fn status(&self) -> Result<QueueStatus> {
        Ok(QueueStatus {
            last_run: self.last_run.get(),
            stats: self.store().stats().await?,
            retention: self.retention.describe(),
        })
    }
}
