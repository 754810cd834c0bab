//! Queue-level handlers: manual firing and status.

use axum::{extract::State, Json};
use serde::Serialize;

use voxq_jobs::{CycleReport, FireOutcome, QueueStatus};

use crate::{ApiError, AppState};

/// Result of a manual firing.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RunQueueResponse {
    Ran { report: CycleReport },
    /// A cycle was already running.
    Skipped,
}

pub async fn run_queue(State(state): State<AppState>) -> Result<Json<RunQueueResponse>, ApiError> {
    let response = match state.trigger.fire().await? {
        FireOutcome::Ran(report) => RunQueueResponse::Ran { report },
        FireOutcome::Skipped => RunQueueResponse::Skipped,
    };
    Ok(Json(response))
}

pub async fn queue_status(State(state): State<AppState>) -> Result<Json<QueueStatus>, ApiError> {
    Ok(Json(state.actions.status().await?))
}
