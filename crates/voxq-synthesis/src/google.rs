//! Google Cloud Text-to-Speech REST client.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use voxq_core::defaults::{
    SYNTH_AUDIO_ENCODING, SYNTH_ENDPOINT, SYNTH_LANGUAGE_CODE, SYNTH_TIMEOUT_SECS,
};
use voxq_core::{
    AudioConfig, AudioOutput, Error, Result, SynthesisClient, SynthesisError,
    SynthesisInput, SynthesisRequest, VoiceSelection,
};

use crate::error;

/// Header carrying the API key. Keeps the secret out of the request URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct GoogleTtsConfig {
    /// API base URL, e.g. `https://texttospeech.googleapis.com/v1beta1/`.
    pub endpoint: String,
    /// API key sent in the `X-Goog-Api-Key` header.
    pub api_key: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for GoogleTtsConfig {
    fn default() -> Self {
        Self {
            endpoint: SYNTH_ENDPOINT.to_string(),
            api_key: String::new(),
            timeout_seconds: SYNTH_TIMEOUT_SECS,
        }
    }
}

impl GoogleTtsConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `SYNTH_ENDPOINT` | `https://texttospeech.googleapis.com/v1beta1/` | API base URL |
    /// | `SYNTH_API_KEY` | (empty) | API key |
    /// | `SYNTH_TIMEOUT_SECS` | `60` | Request timeout |
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("SYNTH_ENDPOINT").unwrap_or_else(|_| SYNTH_ENDPOINT.to_string()),
            api_key: std::env::var("SYNTH_API_KEY").unwrap_or_default(),
            timeout_seconds: std::env::var("SYNTH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(SYNTH_TIMEOUT_SECS),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Resolve the `text:synthesize` URL, or explain why the config is unusable.
    fn synthesize_url(&self) -> std::result::Result<Url, SynthesisError> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(SynthesisError::config("Synthesis endpoint is not configured"));
        }
        if self.api_key.trim().is_empty() {
            return Err(SynthesisError::config("Synthesis API key is not configured"));
        }
        Url::parse(&format!("{}/text:synthesize", endpoint.trim_end_matches('/')))
            .map_err(|e| SynthesisError::config(format!("Invalid synthesis endpoint '{endpoint}': {e}")))
    }
}

/// Request body sent to the API. Voice and audio encoding are mandatory there.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest<'a> {
    input: &'a SynthesisInput,
    voice: VoiceSelection,
    audio_config: AudioConfig,
}

impl<'a> From<&'a SynthesisRequest> for ApiRequest<'a> {
    fn from(request: &'a SynthesisRequest) -> Self {
        let voice = request
            .voice
            .clone()
            .unwrap_or_else(|| VoiceSelection::new(SYNTH_LANGUAGE_CODE));
        let mut audio_config = request.audio_config.clone().unwrap_or_default();
        if audio_config.audio_encoding.is_none() {
            audio_config.audio_encoding = Some(SYNTH_AUDIO_ENCODING);
        }
        Self {
            input: &request.input,
            voice,
            audio_config,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    audio_content: String,
}

/// `SynthesisClient` backed by the Text-to-Speech REST API.
pub struct GoogleTtsClient {
    client: Client,
    config: GoogleTtsConfig,
}

impl GoogleTtsClient {
    /// Create a new client with the given configuration.
    ///
    /// A missing endpoint or key does not fail here; every synthesis call
    /// reports it instead, so the queue records it on each affected job.
    pub fn new(config: GoogleTtsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        info!(
            subsystem = "synthesis",
            component = "google_tts",
            endpoint = %config.endpoint,
            api_key_set = !config.api_key.trim().is_empty(),
            timeout_secs = config.timeout_seconds,
            "Initializing speech synthesis client"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(GoogleTtsConfig::from_env())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &GoogleTtsConfig {
        &self.config
    }
}

#[async_trait]
impl SynthesisClient for GoogleTtsClient {
    #[instrument(skip(self, request), fields(subsystem = "synthesis", component = "google_tts", ssml = request.input.is_ssml()))]
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> std::result::Result<AudioOutput, SynthesisError> {
        let url = self.config.synthesize_url()?;
        let body = ApiRequest::from(request);
        let encoding = body.audio_config.audio_encoding;

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, self.config.api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                if e.is_timeout() {
                    SynthesisError::timeout(format!(
                        "Synthesis request timed out after {}s",
                        self.config.timeout_seconds
                    ))
                } else {
                    SynthesisError::transport(format!("Synthesis request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = error::from_response(status.as_u16(), &text);
            warn!(status = status.as_u16(), error = %err, "Synthesis API returned an error");
            return Err(err);
        }

        let payload: ApiResponse = response
            .json()
            .await
            .map_err(|e| {
                SynthesisError::transport(format!("Invalid synthesis response: {}", e.without_url()))
            })?;

        let audio = base64::engine::general_purpose::STANDARD
            .decode(payload.audio_content.as_bytes())
            .map_err(|e| SynthesisError::api(format!("Invalid audio content encoding: {e}")))?;

        if audio.is_empty() {
            return Err(SynthesisError::api("Synthesis API returned empty audio"));
        }

        debug!(audio_bytes = audio.len(), "Synthesis succeeded");
        Ok(AudioOutput::new(audio, encoding))
    }

    fn name(&self) -> &str {
        "google_tts"
    }
}
