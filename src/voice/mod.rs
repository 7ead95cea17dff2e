//! Microphone speech engine
//!
//! Captures audio with cpal, cuts it into phrases by energy, and transcribes
//! each phrase through an OpenAI-compatible STT endpoint.

mod capture;
mod engine;
mod segmenter;
mod stt;

pub use capture::{AudioCapture, SAMPLE_RATE, encode_wav};
pub use engine::MicrophoneEngine;
pub use segmenter::{SegmenterState, SpeechSegmenter, rms};
pub use stt::{Transcriber, WhisperTranscriber};

use std::sync::Arc;

use crate::config::VoiceConfig;

/// Build the microphone engine described by the voice configuration
///
/// Returns `None` when voice input is disabled.
#[must_use]
pub fn engine_from_config(config: &VoiceConfig) -> Option<MicrophoneEngine> {
    if !config.enabled {
        return None;
    }

    if config.api_key.is_none() && config.stt_url == crate::config::DEFAULT_STT_URL {
        tracing::warn!("no OPENAI_API_KEY set, transcription requests will be rejected");
    }

    let transcriber = Arc::new(WhisperTranscriber::new(config));
    Some(MicrophoneEngine::new(transcriber, config.energy_threshold))
}
