//! In-process job store.
//!
//! All state lives behind one `RwLock`, so every transition (including
//! `claim`) is a single critical section and trivially atomic.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use voxq_core::{
    Error, FieldRef, Job, JobFilter, JobId, JobStatus, JobStore, PageRef, QueueStats, Result,
    SynthesisRequest,
};

#[derive(Debug, Default)]
struct Inner {
    /// Keyed by id; ids are assigned in creation order.
    jobs: BTreeMap<JobId, Job>,
    last_id: i64,
}

/// `JobStore` backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    inner: RwLock<Inner>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs currently stored.
    pub async fn len(&self) -> usize {
        self.inner.read().await.jobs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.jobs.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn enqueue(
        &self,
        request: SynthesisRequest,
        page_ref: PageRef,
        field_ref: FieldRef,
    ) -> Result<JobId> {
        request.validate()?;

        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let id = JobId(inner.last_id);
        let job = Job::new_waiting(id, request, page_ref, field_ref, Utc::now());
        inner.jobs.insert(id, job);

        debug!(subsystem = "db", component = "memory", op = "enqueue", job_id = %id, "Job queued");
        Ok(id)
    }

    async fn list(&self, filter: JobFilter) -> Result<Vec<Job>> {
        let inner = self.inner.read().await;
        let matching = inner.jobs.values().filter(|job| filter.matches(job)).cloned();
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>> {
        Ok(self.inner.read().await.jobs.get(&id).cloned())
    }

    async fn claim(&self, id: JobId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Waiting => {
                job.status = JobStatus::Processing;
                job.claimed_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_completed(&self, id: JobId, at: DateTime<Utc>) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Processing => {
                job.status = JobStatus::Completed;
                job.completed_at = Some(at);
                job.error = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_error(&self, id: JobId, message: &str) -> Result<bool> {
        if message.is_empty() {
            return Err(Error::InvalidInput("error message must not be empty".into()));
        }

        let mut inner = self.inner.write().await;
        match inner.jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Processing => {
                job.status = JobStatus::Error;
                job.error = Some(message.to_string());
                job.completed_at = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reset_to_waiting(&self, id: JobId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let job = inner.jobs.get_mut(&id).ok_or(Error::JobNotFound(id))?;
        if !job.status.is_terminal() {
            return Ok(false);
        }
        job.status = JobStatus::Waiting;
        job.error = None;
        job.completed_at = None;
        job.claimed_at = None;
        Ok(true)
    }

    async fn delete(&self, id: JobId) -> Result<bool> {
        Ok(self.inner.write().await.jobs.remove(&id).is_some())
    }

    async fn delete_by_status(&self, status: JobStatus) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.jobs.len();
        inner.jobs.retain(|_, job| job.status != status);
        Ok((before - inner.jobs.len()) as u64)
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let removed = inner.jobs.len() as u64;
        inner.jobs.clear();
        Ok(removed)
    }

    async fn delete_completed_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.jobs.len();
        inner.jobs.retain(|_, job| {
            !(job.status == JobStatus::Completed
                && job.completed_at.is_some_and(|done| done <= cutoff))
        });
        Ok((before - inner.jobs.len()) as u64)
    }

    async fn stats(&self) -> Result<QueueStats> {
        let inner = self.inner.read().await;
        let mut stats = QueueStats::default();
        for job in inner.jobs.values() {
            stats.record(job.status);
        }
        Ok(stats)
    }

    async fn requeue_stale_processing(&self, claimed_before: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let mut requeued = 0;
        for job in inner.jobs.values_mut() {
            let stale = job.claimed_at.map_or(true, |at| at <= claimed_before);
            if job.status == JobStatus::Processing && stale {
                job.status = JobStatus::Waiting;
                job.claimed_at = None;
                requeued += 1;
            }
        }
        Ok(requeued)
    }
}
