//! Classification of speech API error responses.

use serde::Deserialize;

use voxq_core::SynthesisError;

/// Error categories reported by the Text-to-Speech API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    /// Invalid or missing API key, or key not allowed for the API.
    Authentication,
    /// Quota or rate limit exhausted.
    RateLimited,
    /// Request rejected (bad voice, bad SSML, ...).
    InvalidArgument,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl ApiErrorCode {
    /// Determine error code from HTTP status and the API's status string.
    pub fn from_response(status: u16, api_status: &str) -> Self {
        match (status, api_status) {
            (401 | 403, _) | (_, "UNAUTHENTICATED" | "PERMISSION_DENIED") => Self::Authentication,
            (429, _) | (_, "RESOURCE_EXHAUSTED") => Self::RateLimited,
            (400, _) | (_, "INVALID_ARGUMENT") => Self::InvalidArgument,
            (500..=599, _) => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Refine a classification with the `ErrorInfo.reason` values of the body.
    ///
    /// An invalid key comes back as `400 INVALID_ARGUMENT` with reason
    /// `API_KEY_INVALID`, which is an authentication problem.
    fn refine<'a>(self, reasons: impl IntoIterator<Item = &'a str>) -> Self {
        let auth = reasons.into_iter().any(|reason| {
            reason.starts_with("API_KEY_")
                || matches!(reason, "SERVICE_DISABLED" | "ACCESS_TOKEN_EXPIRED")
        });
        if auth {
            Self::Authentication
        } else {
            self
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}

/// Turn a non-success response into a `SynthesisError`.
///
/// The API's own message is kept verbatim; bodies that are not the standard
/// error envelope fall back to `HTTP <status>: <body>`.
pub fn from_response(status: u16, body: &str) -> SynthesisError {
    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => {
            let error = envelope.error;
            let code = ApiErrorCode::from_response(status, &error.status)
                .refine(error.details.iter().map(|d| d.reason.as_str()));
            (code, error.message)
        }
        _ => {
            let snippet: String = body.trim().chars().take(200).collect();
            let message = if snippet.is_empty() {
                format!("HTTP {status}")
            } else {
                format!("HTTP {status}: {snippet}")
            };
            (ApiErrorCode::from_response(status, ""), message)
        }
    };

    match code {
        ApiErrorCode::Authentication => SynthesisError::config(message),
        _ => SynthesisError::api(message),
    }
}
