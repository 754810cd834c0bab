//! Trait definitions at the seams between the queue and its collaborators.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Result, SynthesisError};
use crate::models::{
    AudioOutput, FieldRef, Job, JobFilter, JobId, JobStatus, PageRef, QueueStats,
    SynthesisRequest,
};

// =============================================================================
// JOB STORE
// =============================================================================

/// Durable record of jobs and their status.
///
/// Every status transition is atomic and visible to subsequent reads.
/// [`JobStore::claim`] is the sole admission point into `processing`: at most
/// one concurrent caller observes `true` for a given job.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Validate the request and store a new waiting job.
    async fn enqueue(
        &self,
        request: SynthesisRequest,
        page_ref: PageRef,
        field_ref: FieldRef,
    ) -> Result<JobId>;

    /// List jobs in creation order.
    async fn list(&self, filter: JobFilter) -> Result<Vec<Job>>;

    /// Get job by ID.
    async fn get(&self, id: JobId) -> Result<Option<Job>>;

    /// Move a job from waiting to processing. `false` if it was not waiting.
    async fn claim(&self, id: JobId) -> Result<bool>;

    /// Mark a processing job as completed at `at`.
    ///
    /// Returns `false` if the job vanished or is no longer processing.
    async fn mark_completed(&self, id: JobId, at: DateTime<Utc>) -> Result<bool>;

    /// Mark a processing job as failed with `message`.
    ///
    /// Returns `false` if the job vanished or is no longer processing.
    async fn mark_error(&self, id: JobId, message: &str) -> Result<bool>;

    /// Return a terminal job to waiting, clearing `error` and `completed_at`.
    ///
    /// `Ok(false)` if the job exists but is not terminal,
    /// `Err(Error::JobNotFound)` if it does not exist.
    async fn reset_to_waiting(&self, id: JobId) -> Result<bool>;

    /// Delete one job regardless of status.
    async fn delete(&self, id: JobId) -> Result<bool>;

    /// Delete every job with `status`.
    async fn delete_by_status(&self, status: JobStatus) -> Result<u64>;

    /// Delete every job.
    async fn delete_all(&self) -> Result<u64>;

    /// Delete completed jobs with `completed_at <= cutoff`.
    async fn delete_completed_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Job counts per status.
    async fn stats(&self) -> Result<QueueStats>;

    /// Return processing jobs claimed at or before `claimed_before` to waiting.
    ///
    /// Only jobs whose claim has outlived any live worker may be passed here;
    /// a job still being synthesized must never be requeued.
    async fn requeue_stale_processing(&self, claimed_before: DateTime<Utc>) -> Result<u64>;
}

// =============================================================================
// SYNTHESIS
// =============================================================================

/// External text-to-audio backend.
#[async_trait]
pub trait SynthesisClient: Send + Sync {
    /// Perform one synthesis call.
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> std::result::Result<AudioOutput, SynthesisError>;

    /// Backend name for logs.
    fn name(&self) -> &str {
        "synthesis"
    }
}

/// Host-side destination for synthesized audio.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Hand over the audio produced for `job`.
    async fn store(&self, job: &Job, audio: AudioOutput) -> std::result::Result<(), SynthesisError>;
}

/// Sink that drops audio. Used when the host consumes audio elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

#[async_trait]
impl AudioSink for DiscardSink {
    async fn store(&self, _job: &Job, _audio: AudioOutput) -> std::result::Result<(), SynthesisError> {
        Ok(())
    }
}
