//! Core data models for the synthesis queue.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Monotonically assigned job identifier. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        JobId(id)
    }
}

/// Opaque reference to a host page. Never dereferenced by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageRef(pub i64);

/// Opaque reference to a host field. Never dereferenced by the queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldRef(pub String);

impl FieldRef {
    pub fn new(field: impl Into<String>) -> Self {
        FieldRef(field.into())
    }
}

// =============================================================================
// STATUS
// =============================================================================

/// Status of a job. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Waiting,
    /// Internal transient state while a synthesis call is in flight.
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Waiting => "waiting",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    /// Terminal for automatic processing; only a manual run re-enters the pipeline.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "waiting" => Ok(JobStatus::Waiting),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "error" => Ok(JobStatus::Error),
            other => Err(Error::InvalidInput(format!("unknown job status '{other}'"))),
        }
    }
}

// =============================================================================
// SYNTHESIS REQUEST
// =============================================================================

/// Synthesis input: plain text or SSML markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisInput {
    Text(String),
    Ssml(String),
}

impl SynthesisInput {
    pub fn is_ssml(&self) -> bool {
        matches!(self, SynthesisInput::Ssml(_))
    }

    pub fn content(&self) -> &str {
        match self {
            SynthesisInput::Text(s) | SynthesisInput::Ssml(s) => s,
        }
    }
}

/// Voice gender as understood by the speech API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SsmlGender {
    SsmlVoiceGenderUnspecified,
    Male,
    Female,
    Neutral,
}

/// Voice selection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSelection {
    pub language_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssml_gender: Option<SsmlGender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natural_sample_rate_hertz: Option<u32>,
}

impl VoiceSelection {
    pub fn new(language_code: impl Into<String>) -> Self {
        Self {
            language_code: language_code.into(),
            name: None,
            ssml_gender: None,
            natural_sample_rate_hertz: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_gender(mut self, gender: SsmlGender) -> Self {
        self.ssml_gender = Some(gender);
        self
    }
}

/// Output audio encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioEncoding {
    AudioEncodingUnspecified,
    Linear16,
    Mp3,
    OggOpus,
    Mulaw,
    Alaw,
}

/// Audio output parameters. Unset fields are left to the API defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_encoding: Option<AudioEncoding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaking_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_gain_db: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate_hertz: Option<u32>,
}

impl AudioConfig {
    pub fn with_encoding(mut self, encoding: AudioEncoding) -> Self {
        self.audio_encoding = Some(encoding);
        self
    }

    pub fn with_speaking_rate(mut self, rate: f64) -> Self {
        self.speaking_rate = Some(rate);
        self
    }

    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = Some(pitch);
        self
    }
}

/// Immutable payload describing one synthesis call.
///
/// Field names follow the speech API so the request can be forwarded as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    pub input: SynthesisInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_config: Option<AudioConfig>,
}

impl SynthesisRequest {
    /// Create a plain-text request.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            input: SynthesisInput::Text(text.into()),
            voice: None,
            audio_config: None,
        }
    }

    /// Create an SSML request.
    pub fn ssml(ssml: impl Into<String>) -> Self {
        Self {
            input: SynthesisInput::Ssml(ssml.into()),
            voice: None,
            audio_config: None,
        }
    }

    pub fn with_voice(mut self, voice: VoiceSelection) -> Self {
        self.voice = Some(voice);
        self
    }

    pub fn with_audio_config(mut self, audio_config: AudioConfig) -> Self {
        self.audio_config = Some(audio_config);
        self
    }

    /// Parse and validate a request from its JSON form.
    pub fn from_json(raw: &str) -> Result<Self> {
        let request: SynthesisRequest = serde_json::from_str(raw)
            .map_err(|e| Error::InvalidInput(format!("malformed synthesis request: {e}")))?;
        request.validate()?;
        Ok(request)
    }
}

// =============================================================================
// JOB
// =============================================================================

/// One request to synthesize audio from stored content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub page_ref: PageRef,
    pub field_ref: FieldRef,
    pub request: SynthesisRequest,
    pub status: JobStatus,
    /// Present only when status is `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Present only when status is `completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// When the job last entered `processing`; cleared when it returns to waiting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// A freshly enqueued job.
    pub fn new_waiting(
        id: JobId,
        request: SynthesisRequest,
        page_ref: PageRef,
        field_ref: FieldRef,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            page_ref,
            field_ref,
            request,
            status: JobStatus::Waiting,
            error: None,
            created_at,
            completed_at: None,
            claimed_at: None,
        }
    }
}

/// Filter for listing jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub limit: Option<usize>,
}

impl JobFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Cap the number of jobs returned. 0 means no cap.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = if limit == 0 { None } else { Some(limit) };
        self
    }

    /// Waiting jobs, oldest first, capped at `limit` (0 = all).
    pub fn waiting(limit: usize) -> Self {
        Self::all().with_status(JobStatus::Waiting).with_limit(limit)
    }

    pub fn matches(&self, job: &Job) -> bool {
        self.status.map_or(true, |s| s == job.status)
    }
}

/// Selector for bulk deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkSelector {
    /// Jobs still waiting to be processed.
    Pending,
    Completed,
    Error,
    All,
}

impl BulkSelector {
    /// Status the selector maps to; `None` for `All`.
    pub fn status(&self) -> Option<JobStatus> {
        match self {
            BulkSelector::Pending => Some(JobStatus::Waiting),
            BulkSelector::Completed => Some(JobStatus::Completed),
            BulkSelector::Error => Some(JobStatus::Error),
            BulkSelector::All => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BulkSelector::Pending => "pending",
            BulkSelector::Completed => "completed",
            BulkSelector::Error => "error",
            BulkSelector::All => "all",
        }
    }
}

impl FromStr for BulkSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(BulkSelector::Pending),
            "completed" => Ok(BulkSelector::Completed),
            "error" => Ok(BulkSelector::Error),
            "all" => Ok(BulkSelector::All),
            other => Err(Error::InvalidInput(format!(
                "unknown selector '{other}', expected pending|completed|error|all"
            ))),
        }
    }
}

/// Job counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub waiting: u64,
    pub processing: u64,
    pub completed: u64,
    pub error: u64,
    pub total: u64,
}

impl QueueStats {
    pub fn record(&mut self, status: JobStatus) {
        match status {
            JobStatus::Waiting => self.waiting += 1,
            JobStatus::Processing => self.processing += 1,
            JobStatus::Completed => self.completed += 1,
            JobStatus::Error => self.error += 1,
        }
        self.total += 1;
    }
}

/// Synthesized audio returned by a synthesis client.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioOutput {
    pub audio_content: Vec<u8>,
    pub encoding: Option<AudioEncoding>,
}

impl AudioOutput {
    pub fn new(audio_content: Vec<u8>, encoding: Option<AudioEncoding>) -> Self {
        Self {
            audio_content,
            encoding,
        }
    }

    pub fn len(&self) -> usize {
        self.audio_content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.audio_content.is_empty()
    }
}

impl fmt::Debug for AudioOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioOutput")
            .field("bytes", &self.audio_content.len())
            .field("encoding", &self.encoding)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_input_json_shape() {
        let req = SynthesisRequest::text("Hello");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, json!({"input": {"text": "Hello"}}));
    }

    #[test]
    fn test_full_request_json_shape() {
        let req = SynthesisRequest::ssml("<speak>Hi</speak>")
            .with_voice(
                VoiceSelection::new("de-DE")
                    .with_name("de-DE-Wavenet-A")
                    .with_gender(SsmlGender::Female),
            )
            .with_audio_config(
                AudioConfig::default()
                    .with_encoding(AudioEncoding::OggOpus)
                    .with_speaking_rate(1.25),
            );
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "input": {"ssml": "<speak>Hi</speak>"},
                "voice": {"languageCode": "de-DE", "name": "de-DE-Wavenet-A", "ssmlGender": "FEMALE"},
                "audioConfig": {"audioEncoding": "OGG_OPUS", "speakingRate": 1.25}
            })
        );
    }

    #[test]
    fn test_encoding_names_match_api() {
        assert_eq!(
            serde_json::to_value(AudioEncoding::Linear16).unwrap(),
            json!("LINEAR16")
        );
        assert_eq!(serde_json::to_value(AudioEncoding::Mp3).unwrap(), json!("MP3"));
        assert_eq!(
            serde_json::to_value(SsmlGender::SsmlVoiceGenderUnspecified).unwrap(),
            json!("SSML_VOICE_GENDER_UNSPECIFIED")
        );
    }

    #[test]
    fn test_from_json_rejects_both_inputs() {
        let err = SynthesisRequest::from_json(r#"{"input": {"text": "a", "ssml": "<speak>b</speak>"}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_from_json_rejects_missing_input() {
        let err = SynthesisRequest::from_json(r#"{"voice": {"languageCode": "en-US"}}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_from_json_accepts_voice_and_audio() {
        let req = SynthesisRequest::from_json(
            r#"{"input": {"text": "Hallo"},
                "voice": {"languageCode": "de-DE", "naturalSampleRateHertz": 24000},
                "audioConfig": {"sampleRateHertz": 16000, "pitch": -2.0}}"#,
        )
        .unwrap();
        assert_eq!(req.input, SynthesisInput::Text("Hallo".into()));
        assert_eq!(req.voice.unwrap().natural_sample_rate_hertz, Some(24000));
        let audio = req.audio_config.unwrap();
        assert_eq!(audio.sample_rate_hertz, Some(16000));
        assert_eq!(audio.pitch, Some(-2.0));
    }

    #[test]
    fn test_job_status_round_trip_strings() {
        for status in [
            JobStatus::Waiting,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("pending".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(!JobStatus::Waiting.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
    }

    #[test]
    fn test_bulk_selector_maps_pending_to_waiting() {
        assert_eq!(BulkSelector::Pending.status(), Some(JobStatus::Waiting));
        assert_eq!(BulkSelector::Completed.status(), Some(JobStatus::Completed));
        assert_eq!(BulkSelector::Error.status(), Some(JobStatus::Error));
        assert_eq!(BulkSelector::All.status(), None);
    }

    #[test]
    fn test_bulk_selector_parse() {
        assert_eq!("all".parse::<BulkSelector>().unwrap(), BulkSelector::All);
        assert_eq!(
            "pending".parse::<BulkSelector>().unwrap(),
            BulkSelector::Pending
        );
        assert!("waiting".parse::<BulkSelector>().is_err());
    }

    #[test]
    fn test_job_filter_waiting_zero_is_unbounded() {
        let filter = JobFilter::waiting(0);
        assert_eq!(filter.status, Some(JobStatus::Waiting));
        assert_eq!(filter.limit, None);
        assert_eq!(JobFilter::waiting(3).limit, Some(3));
    }

    #[test]
    fn test_new_job_is_waiting() {
        let job = Job::new_waiting(
            JobId(1),
            SynthesisRequest::text("Hello"),
            PageRef(1042),
            FieldRef::new("speech"),
            Utc::now(),
        );
        assert_eq!(job.status, JobStatus::Waiting);
        assert!(job.error.is_none());
        assert!(job.completed_at.is_none());
        assert!(job.claimed_at.is_none());

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["pageRef"], json!(1042));
        assert_eq!(value["fieldRef"], json!("speech"));
        assert_eq!(value["status"], json!("waiting"));
        assert!(value.get("completedAt").is_none());
    }

    #[test]
    fn test_queue_stats_record() {
        let mut stats = QueueStats::default();
        stats.record(JobStatus::Waiting);
        stats.record(JobStatus::Waiting);
        stats.record(JobStatus::Error);
        assert_eq!(stats.waiting, 2);
        assert_eq!(stats.error, 1);
        assert_eq!(stats.total, 3);
    }

    #[test]
    fn test_audio_output_debug_hides_bytes() {
        let out = AudioOutput::new(vec![1, 2, 3], Some(AudioEncoding::Mp3));
        let dbg = format!("{:?}", out);
        assert!(dbg.contains("bytes: 3"));
        assert_eq!(out.len(), 3);
    }
}
