//! Configuration management for voice-ask

pub mod file;

use std::time::Duration;

use crate::{Error, Result};

use file::ConfigFile;

/// Default wake word
pub const DEFAULT_WAKE_WORD: &str = "gomez";

/// Default silence bound before capture is stopped
pub const DEFAULT_SILENCE_TIMEOUT: Duration = Duration::from_millis(8000);

/// Default delay between the last transcript and the submission
pub const DEFAULT_SUBMIT_DELAY: Duration = Duration::from_millis(2500);

/// Default OpenAI-compatible transcription endpoint
pub const DEFAULT_STT_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Default RMS energy threshold for speech
pub const DEFAULT_ENERGY_THRESHOLD: f32 = 0.03;

/// voice-ask configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Input controller configuration
    pub input: InputConfig,

    /// Voice capture configuration
    pub voice: VoiceConfig,
}

/// Input controller configuration
#[derive(Debug, Clone)]
pub struct InputConfig {
    /// Keyword that arms command capture (matched case-insensitively)
    pub wake_word: String,

    /// Silence watchdog bound
    pub silence_timeout: Duration,

    /// Submission debounce delay
    pub submit_delay: Duration,

    /// Enable capture when the controller is mounted
    pub auto_listen: bool,

    /// Reset the question text after a successful submit
    pub clear_on_send: bool,

    /// Conversation id passed along with every submitted question
    pub conversation_id: Option<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            wake_word: DEFAULT_WAKE_WORD.to_string(),
            silence_timeout: DEFAULT_SILENCE_TIMEOUT,
            submit_delay: DEFAULT_SUBMIT_DELAY,
            auto_listen: false,
            clear_on_send: true,
            conversation_id: None,
        }
    }
}

/// Voice capture configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable microphone input
    pub enabled: bool,

    /// Transcription endpoint
    pub stt_url: String,

    /// STT model identifier
    pub stt_model: String,

    /// Language hint for the STT model
    pub language: Option<String>,

    /// Bearer token for the transcription endpoint
    pub api_key: Option<String>,

    /// RMS energy threshold for speech segmentation
    pub energy_threshold: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stt_url: DEFAULT_STT_URL.to_string(),
            stt_model: "whisper-1".to_string(),
            language: None,
            api_key: None,
            energy_threshold: DEFAULT_ENERGY_THRESHOLD,
        }
    }
}

impl Config {
    /// Load configuration from the config file and the process environment
    ///
    /// # Errors
    ///
    /// Returns error if the resulting configuration is invalid
    pub fn load() -> Result<Self> {
        Self::load_with_options(false)
    }

    /// Load configuration with explicit voice disable option
    ///
    /// # Errors
    ///
    /// Returns error if the resulting configuration is invalid
    pub fn load_with_options(disable_voice: bool) -> Result<Self> {
        let fc = file::load_config_file();
        let mut config = Self::from_sources(fc, |key| std::env::var(key).ok())?;

        if disable_voice {
            tracing::info!("voice explicitly disabled via --disable-voice");
            config.voice.enabled = false;
        }

        Ok(config)
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// Priority is env > toml > default.
    ///
    /// # Errors
    ///
    /// Returns error if the resulting configuration is invalid
    pub fn from_sources<F>(fc: ConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let input_defaults = InputConfig::default();
        let input = InputConfig {
            wake_word: env("VOICE_ASK_WAKE_WORD")
                .or(fc.input.wake_word)
                .unwrap_or(input_defaults.wake_word),
            silence_timeout: parse_env_millis(&env, "VOICE_ASK_SILENCE_TIMEOUT_MS")
                .or(fc.input.silence_timeout_ms)
                .map_or(input_defaults.silence_timeout, Duration::from_millis),
            submit_delay: parse_env_millis(&env, "VOICE_ASK_SUBMIT_DELAY_MS")
                .or(fc.input.submit_delay_ms)
                .map_or(input_defaults.submit_delay, Duration::from_millis),
            auto_listen: env("VOICE_ASK_AUTO_LISTEN")
                .map(|s| parse_flag(&s))
                .or(fc.input.auto_listen)
                .unwrap_or(input_defaults.auto_listen),
            clear_on_send: env("VOICE_ASK_CLEAR_ON_SEND")
                .map(|s| parse_flag(&s))
                .or(fc.input.clear_on_send)
                .unwrap_or(input_defaults.clear_on_send),
            conversation_id: env("VOICE_ASK_CONVERSATION_ID")
                .or(fc.input.conversation_id)
                .filter(|id| !id.trim().is_empty()),
        };

        let voice_defaults = VoiceConfig::default();
        let voice = VoiceConfig {
            enabled: fc.voice.enabled.unwrap_or(voice_defaults.enabled),
            stt_url: env("VOICE_ASK_STT_URL")
                .or(fc.voice.stt_url)
                .unwrap_or(voice_defaults.stt_url),
            stt_model: env("VOICE_ASK_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or(voice_defaults.stt_model),
            language: fc.voice.language,
            api_key: env("OPENAI_API_KEY").or(fc.voice.api_key),
            energy_threshold: fc
                .voice
                .energy_threshold
                .unwrap_or(voice_defaults.energy_threshold),
        };

        let config = Self { input, voice };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the controller relies on
    ///
    /// # Errors
    ///
    /// Returns error on an empty wake word or a zero timeout
    pub fn validate(&self) -> Result<()> {
        if self.input.wake_word.trim().is_empty() {
            return Err(Error::Config("input.wake_word must not be empty".to_string()));
        }
        if self.input.silence_timeout.is_zero() {
            return Err(Error::Config(
                "input.silence_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.input.submit_delay.is_zero() {
            return Err(Error::Config(
                "input.submit_delay_ms must be greater than zero".to_string(),
            ));
        }
        if !(self.voice.energy_threshold > 0.0 && self.voice.energy_threshold < 1.0) {
            return Err(Error::Config(
                "voice.energy_threshold must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read a millisecond count from `key`, ignoring it with a warning if malformed
fn parse_env_millis<F>(env: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let value = env(key)?;
    match value.trim().parse() {
        Ok(millis) => Some(millis),
        Err(e) => {
            tracing::warn!(
                var = key,
                value = %value,
                error = %e,
                "ignoring unparseable environment variable"
            );
            None
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::file::InputFileConfig;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(ConfigFile::default(), env_from(&[])).unwrap();

        assert_eq!(config.input.wake_word, "gomez");
        assert_eq!(config.input.silence_timeout, Duration::from_millis(8000));
        assert_eq!(config.input.submit_delay, Duration::from_millis(2500));
        assert!(!config.input.auto_listen);
        assert!(config.input.clear_on_send);
        assert!(config.voice.enabled);
    }

    #[test]
    fn test_env_overrides_file() {
        let fc = ConfigFile {
            input: InputFileConfig {
                wake_word: Some("jarvis".to_string()),
                submit_delay_ms: Some(3000),
                ..InputFileConfig::default()
            },
            ..ConfigFile::default()
        };

        let config = Config::from_sources(
            fc,
            env_from(&[("VOICE_ASK_WAKE_WORD", "orin"), ("VOICE_ASK_AUTO_LISTEN", "yes")]),
        )
        .unwrap();

        assert_eq!(config.input.wake_word, "orin");
        assert_eq!(config.input.submit_delay, Duration::from_millis(3000));
        assert!(config.input.auto_listen);
    }

    #[test]
    fn test_unparseable_env_number_falls_through() {
        let config = Config::from_sources(
            ConfigFile::default(),
            env_from(&[("VOICE_ASK_SILENCE_TIMEOUT_MS", "soon")]),
        )
        .unwrap();

        assert_eq!(config.input.silence_timeout, DEFAULT_SILENCE_TIMEOUT);
    }

    #[test]
    fn test_unparseable_env_number_falls_back_to_file() {
        let fc = ConfigFile {
            input: InputFileConfig {
                submit_delay_ms: Some(3000),
                ..InputFileConfig::default()
            },
            ..ConfigFile::default()
        };
        let env = env_from(&[
            ("VOICE_ASK_SUBMIT_DELAY_MS", "2.5s"),
            ("VOICE_ASK_SILENCE_TIMEOUT_MS", " 9000 "),
        ]);

        assert_eq!(parse_env_millis(&env, "VOICE_ASK_SUBMIT_DELAY_MS"), None);
        assert_eq!(parse_env_millis(&env, "VOICE_ASK_SILENCE_TIMEOUT_MS"), Some(9000));

        let config = Config::from_sources(fc, env).unwrap();
        assert_eq!(config.input.submit_delay, Duration::from_millis(3000));
        assert_eq!(config.input.silence_timeout, Duration::from_millis(9000));
    }

    #[test]
    fn test_blank_wake_word_rejected() {
        let result =
            Config::from_sources(ConfigFile::default(), env_from(&[("VOICE_ASK_WAKE_WORD", "  ")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_delay_rejected() {
        let result = Config::from_sources(
            ConfigFile::default(),
            env_from(&[("VOICE_ASK_SUBMIT_DELAY_MS", "0")]),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_blank_conversation_id_dropped() {
        let config = Config::from_sources(
            ConfigFile::default(),
            env_from(&[("VOICE_ASK_CONVERSATION_ID", "")]),
        )
        .unwrap();
        assert!(config.input.conversation_id.is_none());
    }
}
