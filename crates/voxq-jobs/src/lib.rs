//! # voxq-jobs
//!
//! Queue engine for voxqueue.
//!
//! This crate provides:
//! - `QueueRunner`: FIFO batch selection, claim, bounded concurrent synthesis
//! - `RetentionSweeper`: time-based deletion of completed jobs
//! - `Trigger`: non-overlapping scheduled/manual cycles with broadcast events
//! - `QueueActions`: manual run, delete and status operations
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use voxq_db::MemoryJobStore;
//! use voxq_jobs::{QueueConfig, QueueRunner, RetentionSweeper, Trigger};
//! use voxq_synthesis::GoogleTtsClient;
//!
//! let config = QueueConfig::from_env();
//! let store = Arc::new(MemoryJobStore::new());
//! let client = Arc::new(GoogleTtsClient::from_env()?);
//!
//! let runner = QueueRunner::new(store.clone(), client);
//! let sweeper = RetentionSweeper::new(store, config.retention_policy());
//! let handle = Trigger::new(runner, sweeper, &config).start();
//!
//! let mut events = handle.events();
//! while let Ok(event) = events.recv().await {
//!     println!("Event: {:?}", event);
//! }
//!
//! handle.shutdown().await?;
//! ```

pub mod actions;
pub mod config;
pub mod events;
pub mod last_run;
pub mod retention;
pub mod runner;
pub mod trigger;

pub use actions::{QueueActions, QueueStatus};
pub use config::QueueConfig;
pub use events::TriggerEvent;
pub use last_run::LastRun;
pub use retention::{RetentionPolicy, RetentionSweeper, SweepReport};
pub use runner::{BatchReport, JobOutcome, QueueRunner};
pub use trigger::{CycleReport, FireOutcome, Trigger, TriggerHandle};
