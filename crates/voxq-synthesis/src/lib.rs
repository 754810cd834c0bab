//! # voxq-synthesis
//!
//! Speech-synthesis clients for voxqueue.
//!
//! This crate provides:
//! - `GoogleTtsClient`, a `SynthesisClient` for the Text-to-Speech REST API
//! - Classification of API error responses
//! - A scripted mock client (feature `mock`)
//!
//! # Example
//!
//! ```rust,no_run
//! use voxq_core::{SynthesisClient, SynthesisRequest};
//! use voxq_synthesis::{GoogleTtsClient, GoogleTtsConfig};
//!
//! # async fn demo() -> voxq_core::Result<()> {
//! let client = GoogleTtsClient::new(GoogleTtsConfig::default().with_api_key("..."))?;
//! let audio = client.synthesize(&SynthesisRequest::text("Hello")).await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod google;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::ApiErrorCode;
pub use google::{GoogleTtsClient, GoogleTtsConfig};
