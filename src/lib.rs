//! voice-ask - Hands-free voice question input
//!
//! This library turns a continuous speech stream into discrete questions:
//! - Wake word gating with command extraction
//! - Submission debouncing and a silence watchdog
//! - Coordination with answer playback
//! - A microphone engine (cpal capture + Whisper-compatible STT)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Host / UI                           │
//! │   question field  │  mic button  │  answer playback  │
//! └────────────────────┬────────────────────────────────┘
//!                      │ ControllerHandle
//! ┌────────────────────▼────────────────────────────────┐
//! │               InputController                        │
//! │   Session  │  Wake Word  │  Watchdog  │  Debounce   │
//! └────────────────────┬────────────────────────────────┘
//!                      │ SpeechEngine
//! ┌────────────────────▼────────────────────────────────┐
//! │              MicrophoneEngine                        │
//! │   cpal capture  │  segmenter  │  STT endpoint        │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod input;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use input::{
    Collaborators, ControllerHandle, ControllerSnapshot, ControllerState, InputController,
    PlaybackBridge, PlaybackState, Question, SharedPlayback, SpeechEngine, SubmitSink,
    SubmitSource, spawn,
};
pub use voice::MicrophoneEngine;
