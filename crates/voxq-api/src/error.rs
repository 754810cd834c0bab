//! Mapping of queue errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

/// Handler error rendered as `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    Internal(voxq_core::Error),
    NotFound(String),
    BadRequest(String),
}

impl From<voxq_core::Error> for ApiError {
    fn from(err: voxq_core::Error) -> Self {
        match &err {
            voxq_core::Error::JobNotFound(_) => ApiError::NotFound(err.to_string()),
            voxq_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            _ => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Internal(err) => {
                tracing::error!(subsystem = "api", error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
