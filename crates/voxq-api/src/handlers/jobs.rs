//! Job HTTP handlers: enqueue, list, get, run and delete.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use voxq_core::{BulkSelector, FieldRef, Job, JobFilter, JobId, JobStatus, PageRef, SynthesisRequest};
use voxq_jobs::JobOutcome;

use crate::{ApiError, AppState};

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

/// Query parameters for listing jobs.
#[derive(Debug, Default, Deserialize)]
pub struct ListJobsQuery {
    /// Only jobs with this status (`waiting|processing|completed|error`)
    pub status: Option<String>,
    /// Maximum number of jobs (0 or absent = all)
    pub limit: Option<usize>,
}

/// Request body for enqueueing a job.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueJobRequest {
    pub page_ref: i64,
    pub field_ref: String,
    /// Synthesis payload; parsed and validated before a job is created.
    pub request: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct EnqueueJobResponse {
    pub id: JobId,
}

/// Result of a manual run.
#[derive(Debug, Serialize)]
pub struct RunJobResponse {
    pub id: JobId,
    /// `completed`, `failed` or `skipped`
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunJobResponse {
    fn new(id: JobId, outcome: JobOutcome) -> Self {
        let (outcome, error) = match outcome {
            JobOutcome::Completed => ("completed", None),
            JobOutcome::Failed(message) => ("failed", Some(message)),
            JobOutcome::Skipped => ("skipped", None),
        };
        Self { id, outcome, error }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}

// =============================================================================
// HANDLERS
// =============================================================================

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<Vec<Job>>, ApiError> {
    let mut filter = JobFilter::all().with_limit(query.limit.unwrap_or(0));
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        filter = filter.with_status(status.parse::<JobStatus>()?);
    }
    Ok(Json(state.actions.list(filter).await?))
}

pub async fn enqueue_job(
    State(state): State<AppState>,
    Json(body): Json<EnqueueJobRequest>,
) -> Result<(StatusCode, Json<EnqueueJobResponse>), ApiError> {
    let request = SynthesisRequest::from_json(&body.request.to_string())?;
    let id = state
        .actions
        .enqueue(request, PageRef(body.page_ref), FieldRef(body.field_ref))
        .await?;
    Ok((StatusCode::CREATED, Json(EnqueueJobResponse { id })))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.actions.get(JobId(id)).await?))
}

pub async fn run_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RunJobResponse>, ApiError> {
    let id = JobId(id);
    let outcome = state.actions.run(id).await?;
    Ok(Json(RunJobResponse::new(id, outcome)))
}

pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let id = JobId(id);
    if state.actions.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Job not found: {id}")))
    }
}

pub async fn delete_jobs_bulk(
    State(state): State<AppState>,
    Path(selector): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let selector: BulkSelector = selector.parse()?;
    let deleted = state.actions.delete_bulk(selector).await?;
    Ok(Json(DeleteResponse { deleted }))
}
