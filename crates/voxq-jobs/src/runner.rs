//! Batch and single-job execution against the job store.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use voxq_core::defaults::{SYNTH_TIMEOUT_SECS, UNLIMITED_BATCH_CONCURRENCY};
use voxq_core::{
    AudioSink, DiscardSink, Error, Job, JobFilter, JobId, JobStore, Result, SynthesisClient,
    SynthesisError,
};

use crate::events::TriggerEvent;

/// Result of processing one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Audio produced and the job marked completed.
    Completed,
    /// The job was marked error with this message.
    Failed(String),
    /// The job was not ours to process (claim lost, or it vanished mid-flight).
    Skipped,
}

/// Summary of one `process_batch` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Correlation id used in the batch's log lines.
    pub batch_id: Uuid,
    /// Waiting jobs selected for the batch.
    pub selected: usize,
    /// Jobs this batch moved into processing.
    pub claimed: usize,
    pub completed: usize,
    pub failed: usize,
    /// Selected jobs that were not processed by this batch.
    pub skipped: usize,
    pub duration_ms: u64,
}

impl BatchReport {
    fn new(batch_id: Uuid, selected: usize) -> Self {
        Self {
            batch_id,
            selected,
            claimed: 0,
            completed: 0,
            failed: 0,
            skipped: 0,
            duration_ms: 0,
        }
    }

    fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Completed => {
                self.claimed += 1;
                self.completed += 1;
            }
            JobOutcome::Failed(_) => {
                self.claimed += 1;
                self.failed += 1;
            }
            JobOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Claims waiting jobs and drives them through synthesis.
///
/// Cheap to clone; clones share the store, client, sink and event channel.
#[derive(Clone)]
pub struct QueueRunner {
    store: Arc<dyn JobStore>,
    client: Arc<dyn SynthesisClient>,
    sink: Arc<dyn AudioSink>,
    synthesis_timeout: Duration,
    event_tx: Option<broadcast::Sender<TriggerEvent>>,
}

impl QueueRunner {
    /// Create a runner that discards produced audio.
    pub fn new(store: Arc<dyn JobStore>, client: Arc<dyn SynthesisClient>) -> Self {
        Self {
            store,
            client,
            sink: Arc::new(DiscardSink),
            synthesis_timeout: Duration::from_secs(SYNTH_TIMEOUT_SECS),
            event_tx: None,
        }
    }

    /// Hand produced audio to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn AudioSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_synthesis_timeout(mut self, timeout: Duration) -> Self {
        self.synthesis_timeout = timeout;
        self
    }

    /// Publish job events on `event_tx`.
    pub fn with_events(mut self, event_tx: broadcast::Sender<TriggerEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Process up to `limit` waiting jobs, oldest first (0 = all).
    ///
    /// In-flight synthesis calls never exceed `limit`, or
    /// `UNLIMITED_BATCH_CONCURRENCY` when `limit` is 0. Job failures are
    /// recorded on the jobs; only store failures are returned. After a store
    /// failure no further jobs are claimed, in-flight jobs finish, and the
    /// first error is returned.
    #[instrument(skip(self), fields(subsystem = "jobs", component = "runner", op = "process_batch"))]
    pub async fn process_batch(&self, limit: usize) -> Result<BatchReport> {
        let start = Instant::now();
        let batch_id = Uuid::now_v7();

        let jobs = self.store.list(JobFilter::waiting(limit)).await?;
        let mut report = BatchReport::new(batch_id, jobs.len());

        if jobs.is_empty() {
            debug!(%batch_id, "No waiting jobs");
            return Ok(report);
        }

        let concurrency = if limit == 0 {
            UNLIMITED_BATCH_CONCURRENCY
        } else {
            limit
        };
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let abort = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();
        let mut not_started = 0;

        info!(%batch_id, selected = jobs.len(), concurrency, "Processing batch");

        let total = jobs.len();
        for (index, job) in jobs.into_iter().enumerate() {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| Error::Internal(format!("Batch semaphore closed: {e}")))?;

            if abort.load(Ordering::SeqCst) {
                not_started = total - index;
                break;
            }

            let runner = self.clone();
            let abort = abort.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let result = runner.claim_and_run(job, Some(batch_id)).await;
                if result.is_err() {
                    abort.store(true, Ordering::SeqCst);
                }
                result
            });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(outcome)) => report.record(&outcome),
                Ok(Err(e)) => {
                    error!(%batch_id, error = %e, "Job store failure, aborting batch");
                    report.skipped += 1;
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    error!(%batch_id, error = ?e, "Job task panicked");
                    report.failed += 1;
                }
            }
        }
        report.skipped += not_started;
        report.duration_ms = start.elapsed().as_millis() as u64;

        if let Some(e) = first_error {
            return Err(e);
        }

        info!(
            %batch_id,
            selected = report.selected,
            completed = report.completed,
            failed = report.failed,
            skipped = report.skipped,
            duration_ms = report.duration_ms,
            "Batch finished"
        );
        Ok(report)
    }

    /// Claim and process one job by id.
    ///
    /// `Error::JobNotFound` if it does not exist; `JobOutcome::Skipped` if it
    /// is not waiting.
    #[instrument(skip(self), fields(subsystem = "jobs", component = "runner", op = "process_job", job_id = %id))]
    pub async fn process_job(&self, id: JobId) -> Result<JobOutcome> {
        let job = self.store.get(id).await?.ok_or(Error::JobNotFound(id))?;
        self.claim_and_run(job, None).await
    }

    async fn claim_and_run(&self, job: Job, batch_id: Option<Uuid>) -> Result<JobOutcome> {
        let job_id = job.id;

        if !self.store.claim(job_id).await? {
            debug!(%job_id, ?batch_id, "Job already claimed, skipping");
            return Ok(JobOutcome::Skipped);
        }

        let start = Instant::now();
        info!(%job_id, ?batch_id, page_ref = job.page_ref.0, client = self.client.name(), "Processing job");
        self.emit(TriggerEvent::JobStarted { job_id });

        let attempt = AssertUnwindSafe(self.synthesize(&job))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(panic_failure(payload.as_ref())));

        match attempt {
            Ok(()) => {
                if !self.store.mark_completed(job_id, Utc::now()).await? {
                    warn!(%job_id, "Job left processing during synthesis, result dropped");
                    return Ok(JobOutcome::Skipped);
                }
                info!(
                    %job_id,
                    ?batch_id,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Job completed successfully"
                );
                self.emit(TriggerEvent::JobCompleted { job_id });
                Ok(JobOutcome::Completed)
            }
            Err(failure) => {
                let message = if failure.message.trim().is_empty() {
                    format!("Synthesis failed ({:?})", failure.kind)
                } else {
                    failure.message
                };
                if !self.store.mark_error(job_id, &message).await? {
                    warn!(%job_id, "Job left processing during synthesis, failure dropped");
                    return Ok(JobOutcome::Skipped);
                }
                warn!(
                    %job_id,
                    ?batch_id,
                    kind = ?failure.kind,
                    error = %message,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Job failed"
                );
                self.emit(TriggerEvent::JobFailed {
                    job_id,
                    error: message.clone(),
                });
                Ok(JobOutcome::Failed(message))
            }
        }
    }

    /// Synthesis call under the timeout, then the sink.
    async fn synthesize(&self, job: &Job) -> std::result::Result<(), SynthesisError> {
        let audio = match tokio::time::timeout(
            self.synthesis_timeout,
            self.client.synthesize(&job.request),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(SynthesisError::timeout(format!(
                    "Synthesis exceeded timeout of {:?}",
                    self.synthesis_timeout
                )))
            }
        };

        debug!(job_id = %job.id, audio_bytes = audio.len(), "Handing audio to sink");
        self.sink.store(job, audio).await
    }

    fn emit(&self, event: TriggerEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

/// Failure recorded on a job whose client or sink panicked.
fn panic_failure(payload: &(dyn Any + Send)) -> SynthesisError {
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic");
    SynthesisError::panic(format!("Synthesis panicked: {detail}"))
}
