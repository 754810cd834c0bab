//! # voxq-api
//!
//! HTTP adapter over the voxqueue command interface.
//!
//! The router exposes enqueue, inspection, manual run and delete operations
//! plus manual trigger firing. Transport concerns stay here; every handler
//! delegates to [`voxq_jobs::QueueActions`] or [`voxq_jobs::Trigger`].

pub mod error;
pub mod handlers;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use voxq_jobs::{QueueActions, Trigger};

pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub actions: QueueActions,
    pub trigger: Trigger,
}

impl AppState {
    pub fn new(trigger: Trigger) -> Self {
        Self {
            actions: trigger.actions(),
            trigger,
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/jobs",
            get(handlers::jobs::list_jobs).post(handlers::jobs::enqueue_job),
        )
        .route(
            "/api/v1/jobs/bulk/:selector",
            delete(handlers::jobs::delete_jobs_bulk),
        )
        .route(
            "/api/v1/jobs/:id",
            get(handlers::jobs::get_job).delete(handlers::jobs::delete_job),
        )
        .route("/api/v1/jobs/:id/run", post(handlers::jobs::run_job))
        .route("/api/v1/queue/run", post(handlers::queue::run_queue))
        .route("/api/v1/queue/status", get(handlers::queue::queue_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
