//! Events broadcast by the trigger and runner.

use voxq_core::JobId;

use crate::trigger::CycleReport;

/// Event emitted while the queue is being processed.
#[derive(Debug, Clone)]
pub enum TriggerEvent {
    /// Scheduled trigger started.
    TriggerStarted,
    /// Scheduled trigger stopped.
    TriggerStopped,
    /// A firing was dropped because the previous cycle is still running.
    CycleSkipped,
    /// A job was claimed and its synthesis call started.
    JobStarted { job_id: JobId },
    /// A job completed successfully.
    JobCompleted { job_id: JobId },
    /// A job failed.
    JobFailed { job_id: JobId, error: String },
    /// A cycle finished (batch and sweep).
    CycleFinished { report: CycleReport },
    /// A cycle was aborted by a persistence failure.
    CycleFailed { error: String },
}
