//! # voxq-core
//!
//! Core types, traits, and abstractions for the voxqueue synthesis queue.
//!
//! This crate provides the job model and its state machine, the request
//! payload sent to the speech API, and the trait seams (`JobStore`,
//! `SynthesisClient`, `AudioSink`) that the other crates implement.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;
pub mod validation;

// Re-export commonly used types at crate root
pub use error::{Error, Result, SynthesisError, SynthesisErrorKind};
pub use models::*;
pub use traits::*;
