//! Scripted synthesis client for deterministic testing.
//!
//! ```rust
//! use voxq_synthesis::mock::MockSynthesisClient;
//!
//! let client = MockSynthesisClient::failing("quota exceeded");
//! client.succeed();
//! assert_eq!(client.call_count(), 0);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use voxq_core::{
    AudioEncoding, AudioOutput, SynthesisClient, SynthesisError, SynthesisErrorKind,
    SynthesisRequest,
};

#[derive(Debug, Default)]
struct MockState {
    /// Failure returned for every call without a per-input override.
    failure: Option<SynthesisError>,
    /// Failures keyed by input content.
    failures_by_input: HashMap<String, SynthesisError>,
    latency: Duration,
    calls: Vec<SynthesisRequest>,
}

/// Mock synthesis client.
///
/// Records every call and the highest number of calls in flight at once.
#[derive(Clone, Default)]
pub struct MockSynthesisClient {
    state: Arc<Mutex<MockState>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockSynthesisClient {
    /// A client whose calls all succeed.
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// A client whose calls all fail with `message` (an API error).
    pub fn failing(message: impl Into<String>) -> Self {
        let client = Self::default();
        client.fail_with(SynthesisError::api(message));
        client
    }

    /// Delay every call by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = latency;
        self
    }

    /// Fail calls whose input content equals `content`.
    pub fn with_failure_for(self, content: impl Into<String>, message: impl Into<String>) -> Self {
        self.lock()
            .failures_by_input
            .insert(content.into(), SynthesisError::api(message));
        self
    }

    /// Make every following call fail with `error`.
    pub fn fail_with(&self, error: SynthesisError) {
        self.lock().failure = Some(error);
    }

    /// Make every following call succeed (per-input failures still apply).
    pub fn succeed(&self) {
        self.lock().failure = None;
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Requests received, in call order.
    pub fn calls(&self) -> Vec<SynthesisRequest> {
        self.lock().calls.clone()
    }

    /// Highest number of concurrent calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Audio bytes derived from the input, so callers can tell outputs apart.
    fn fake_audio(request: &SynthesisRequest) -> AudioOutput {
        let mut bytes = b"ID3".to_vec();
        bytes.extend_from_slice(request.input.content().as_bytes());
        AudioOutput::new(bytes, Some(AudioEncoding::Mp3))
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SynthesisClient for MockSynthesisClient {
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> std::result::Result<AudioOutput, SynthesisError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlightGuard(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let (latency, outcome) = {
            let mut state = self.lock();
            state.calls.push(request.clone());
            let outcome = state
                .failures_by_input
                .get(request.input.content())
                .or(state.failure.as_ref())
                .cloned();
            (state.latency, outcome)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match outcome {
            Some(err) => Err(err),
            None => Ok(Self::fake_audio(request)),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Shorthand for a configuration failure, as a misconfigured client reports it.
pub fn config_error(message: impl Into<String>) -> SynthesisError {
    SynthesisError::new(SynthesisErrorKind::Config, message)
}
