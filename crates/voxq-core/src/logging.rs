//! Structured logging field name constants for voxqueue.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query by the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Persistence failure, aborted cycle, requires operator attention |
//! | WARN  | Job failed or timed out, trigger firing skipped |
//! | INFO  | Lifecycle events (startup, shutdown), batch and sweep completions |
//! | DEBUG | Claim conflicts, decision points, config choices |
//! | TRACE | Per-request payload details |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "db", "synthesis", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "runner", "sweeper", "trigger", "google_tts", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "process_batch", "claim", "sweep", "synthesize"
pub const OPERATION: &str = "op";

/// Correlation ID of one batch (UUIDv7).
pub const BATCH_ID: &str = "batch_id";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Job id being processed.
pub const JOB_ID: &str = "job_id";

/// Host page reference of a job.
pub const PAGE_REF: &str = "page_ref";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of jobs selected for a batch.
pub const SELECTED: &str = "selected";

/// Number of jobs removed by a delete or sweep.
pub const DELETED: &str = "deleted";

/// Byte length of synthesized audio.
pub const AUDIO_BYTES: &str = "audio_bytes";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
