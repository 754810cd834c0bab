//! # voxq-db
//!
//! Job store implementations for voxqueue.
//!
//! This crate provides:
//! - `MemoryJobStore`, an in-process store for tests and single-node setups
//! - `PgJobStore`, a PostgreSQL store with embedded migrations
//! - Connection pool helpers
//!
//! ## Example
//!
//! ```rust,ignore
//! use voxq_db::{PgJobStore, PoolConfig};
//! use voxq_core::{FieldRef, JobStore, PageRef, SynthesisRequest};
//!
//! let store = PgJobStore::connect("postgres://localhost/voxqueue", PoolConfig::default()).await?;
//! let id = store
//!     .enqueue(SynthesisRequest::text("Hello"), PageRef(1042), FieldRef::new("speech"))
//!     .await?;
//! ```

pub mod jobs;
pub mod memory;
pub mod pool;

// Re-export core types
pub use voxq_core::*;

pub use jobs::PgJobStore;
pub use memory::MemoryJobStore;
pub use pool::{create_pool, log_pool_metrics, PoolConfig};
