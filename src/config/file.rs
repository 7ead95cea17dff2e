//! TOML configuration file loading
//!
//! Supports `~/.config/voice-ask/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Question input controller settings
    #[serde(default)]
    pub input: InputFileConfig,

    /// Microphone and speech-to-text settings
    #[serde(default)]
    pub voice: VoiceFileConfig,
}

/// Input controller configuration
#[derive(Debug, Default, Deserialize)]
pub struct InputFileConfig {
    /// Keyword that promotes passive listening to command capture
    pub wake_word: Option<String>,

    /// Stop capture after this long without a new transcript
    pub silence_timeout_ms: Option<u64>,

    /// Wait this long after the last transcript before submitting
    pub submit_delay_ms: Option<u64>,

    /// Start listening as soon as the controller is mounted
    pub auto_listen: Option<bool>,

    /// Clear the question field after a successful submit
    pub clear_on_send: Option<bool>,

    /// Conversation to attach submitted questions to
    pub conversation_id: Option<String>,
}

/// Voice capture configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable microphone input
    pub enabled: Option<bool>,

    /// OpenAI-compatible transcription endpoint
    pub stt_url: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// Spoken language hint (ISO-639-1)
    pub language: Option<String>,

    /// API key for the transcription endpoint
    pub api_key: Option<String>,

    /// RMS energy above which a chunk counts as speech
    pub energy_threshold: Option<f32>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ConfigFile {
    config_file_path().map_or_else(ConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from an explicit path
///
/// Missing, unreadable and malformed files all fall back to defaults.
pub fn load_config_file_from(path: &Path) -> ConfigFile {
    if !path.exists() {
        return ConfigFile::default();
    }

    match parse_config_file(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            ConfigFile::default()
        }
    }
}

/// Parse a TOML config file
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn parse_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Return the config file path: `~/.config/voice-ask/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voice-ask").join("config.toml"))
}
