//! Speech-to-text over an OpenAI-compatible transcription endpoint

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::config::VoiceConfig;
use crate::{Error, Result};

/// Transcription response body
#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Turns a WAV phrase into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe WAV audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String>;
}

/// Transcriber for `/v1/audio/transcriptions` style endpoints
pub struct WhisperTranscriber {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
    language: Option<String>,
}

impl WhisperTranscriber {
    /// Create a transcriber from voice configuration
    #[must_use]
    pub fn new(config: &VoiceConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.stt_url.clone(),
            model: config.stt_model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            language: config.language.clone(),
        }
    }

    /// Endpoint this transcriber posts to
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
        tracing::debug!(audio_bytes = wav.len(), url = %self.url, "starting transcription");

        let part = Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| Error::Stt(e.to_string()))?;

        let mut form = Form::new()
            .text("model", self.model.clone())
            .part("file", part);

        if let Some(ref lang) = self.language {
            form = form.text("language", lang.clone());
        }

        let mut request = self.client.post(&self.url).multipart(form);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "transcription request failed");
            e
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::Stt(format!("transcription API error {status}: {body}")));
        }

        let result: TranscriptionResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse transcription response");
            e
        })?;

        tracing::debug!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_api_key_is_dropped() {
        let config = VoiceConfig {
            api_key: Some(String::new()),
            ..VoiceConfig::default()
        };
        let transcriber = WhisperTranscriber::new(&config);
        assert!(transcriber.api_key.is_none());
        assert_eq!(transcriber.url(), crate::config::DEFAULT_STT_URL);
    }
}
