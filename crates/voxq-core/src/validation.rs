//! Synthesis request validation.
//!
//! Runs before a job is created; a rejected request is never stored.

use crate::defaults::{
    PITCH_LIMIT, SPEAKING_RATE_MAX, SPEAKING_RATE_MIN, VOLUME_GAIN_MAX_DB, VOLUME_GAIN_MIN_DB,
};
use crate::error::{Error, Result};
use crate::models::{AudioConfig, SynthesisInput, SynthesisRequest, VoiceSelection};

impl SynthesisRequest {
    /// Check the request against the limits the speech API accepts.
    pub fn validate(&self) -> Result<()> {
        validate_input(&self.input)?;
        if let Some(voice) = &self.voice {
            validate_voice(voice)?;
        }
        if let Some(audio) = &self.audio_config {
            validate_audio(audio)?;
        }
        Ok(())
    }
}

fn validate_input(input: &SynthesisInput) -> Result<()> {
    match input {
        SynthesisInput::Text(text) if text.trim().is_empty() => {
            Err(invalid("input.text must not be empty"))
        }
        SynthesisInput::Ssml(ssml) if ssml.trim().is_empty() => {
            Err(invalid("input.ssml must not be empty"))
        }
        SynthesisInput::Ssml(ssml) if !ssml.trim_start().starts_with("<speak") => {
            Err(invalid("input.ssml must be wrapped in a <speak> element"))
        }
        _ => Ok(()),
    }
}

fn validate_voice(voice: &VoiceSelection) -> Result<()> {
    if voice.language_code.trim().is_empty() {
        return Err(invalid("voice.languageCode must not be empty"));
    }
    if voice.natural_sample_rate_hertz == Some(0) {
        return Err(invalid("voice.naturalSampleRateHertz must be positive"));
    }
    Ok(())
}

fn validate_audio(audio: &AudioConfig) -> Result<()> {
    check_range(
        "audioConfig.speakingRate",
        audio.speaking_rate,
        SPEAKING_RATE_MIN,
        SPEAKING_RATE_MAX,
    )?;
    check_range("audioConfig.pitch", audio.pitch, -PITCH_LIMIT, PITCH_LIMIT)?;
    check_range(
        "audioConfig.volumeGainDb",
        audio.volume_gain_db,
        VOLUME_GAIN_MIN_DB,
        VOLUME_GAIN_MAX_DB,
    )?;
    if audio.sample_rate_hertz == Some(0) {
        return Err(invalid("audioConfig.sampleRateHertz must be positive"));
    }
    Ok(())
}

fn check_range(field: &str, value: Option<f64>, min: f64, max: f64) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v < min || v > max => Err(Error::InvalidInput(format!(
            "{field} must be between {min} and {max}, got {v}"
        ))),
        _ => Ok(()),
    }
}

fn invalid(msg: &str) -> Error {
    Error::InvalidInput(msg.to_string())
}
