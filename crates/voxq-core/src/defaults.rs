//! Centralized default constants for voxqueue.
//!
//! Every crate and the API binary reference these constants instead of
//! defining their own magic numbers. Values for the synthesis endpoint,
//! schedule and retention match what a fresh installation ships with.

use crate::models::AudioEncoding;

// =============================================================================
// SYNTHESIS API
// =============================================================================

/// Default Text-to-Speech REST endpoint (must end with a slash).
pub const SYNTH_ENDPOINT: &str = "https://texttospeech.googleapis.com/v1beta1/";

/// Request timeout for a single synthesis call in seconds.
pub const SYNTH_TIMEOUT_SECS: u64 = 60;

/// Age in seconds after which a `processing` claim counts as orphaned.
///
/// Must exceed the longest time a live worker holds a claim.
pub const STALE_CLAIM_SECS: u64 = 600;

/// Language code sent when a request carries no voice selection.
pub const SYNTH_LANGUAGE_CODE: &str = "en-US";

/// Audio encoding sent when a request does not choose one.
pub const SYNTH_AUDIO_ENCODING: AudioEncoding = AudioEncoding::Mp3;

// =============================================================================
// SCHEDULE
// =============================================================================

/// Default schedule period in seconds (5 minutes).
pub const CRON_SCHEDULE_SECS: u64 = 300;

/// Default number of jobs processed per trigger firing.
pub const CRON_PARALLEL_CALLS: usize = 3;

/// Upper bound accepted for the parallel-calls setting.
pub const CRON_PARALLEL_CALLS_MAX: usize = 1000;

/// In-flight synthesis bound used when parallel calls is 0 ("all").
pub const UNLIMITED_BATCH_CONCURRENCY: usize = 8;

// =============================================================================
// RETENTION
// =============================================================================

/// Whether completed jobs are deleted by the retention sweep.
pub const DELETE_COMPLETED: bool = true;

/// Seconds after completion before a job is swept (1 day).
pub const DELETE_COMPLETED_AFTER_SECS: u64 = 86_400;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default trigger event broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// REQUEST LIMITS
// =============================================================================

/// Minimum accepted speaking rate.
pub const SPEAKING_RATE_MIN: f64 = 0.25;

/// Maximum accepted speaking rate.
pub const SPEAKING_RATE_MAX: f64 = 4.0;

/// Pitch bound in semitones (applies symmetrically).
pub const PITCH_LIMIT: f64 = 20.0;

/// Minimum accepted volume gain in dB.
pub const VOLUME_GAIN_MIN_DB: f64 = -96.0;

/// Maximum accepted volume gain in dB.
pub const VOLUME_GAIN_MAX_DB: f64 = 16.0;
