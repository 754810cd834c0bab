//! Error types for voxqueue.

use thiserror::Error;

use crate::models::JobId;

/// Result type alias using voxqueue's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for queue operations.
///
/// Job-level synthesis failures are not represented here; they are recorded on
/// the job and carried by [`SynthesisError`].
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Job store unavailable or inconsistent
    #[error("Store error: {0}")]
    Store(String),

    /// Job not found
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    /// Invalid input (malformed synthesis request)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error means the job store itself failed.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Store(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Category of a failed synthesis call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisErrorKind {
    /// Endpoint or credential missing/invalid.
    Config,
    /// The API answered with an error.
    Api,
    /// Network or protocol failure before a usable answer arrived.
    Transport,
    /// The call did not return in time.
    Timeout,
    /// The audio could not be handed to the host.
    Sink,
    /// The client or sink panicked.
    Panic,
}

/// A failed synthesis attempt.
///
/// Displays as the bare message so it can be stored on the job verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SynthesisError {
    pub kind: SynthesisErrorKind,
    pub message: String,
}

impl SynthesisError {
    pub fn new(kind: SynthesisErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(SynthesisErrorKind::Config, message)
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::new(SynthesisErrorKind::Api, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(SynthesisErrorKind::Transport, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(SynthesisErrorKind::Timeout, message)
    }

    pub fn sink(message: impl Into<String>) -> Self {
        Self::new(SynthesisErrorKind::Sink, message)
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Self::new(SynthesisErrorKind::Panic, message)
    }
}
