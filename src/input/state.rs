//! Controller state and the snapshot exposed to the UI

use std::fmt;
use std::time::Instant;

/// State of the input controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    /// Capture off
    #[default]
    Idle,
    /// Capturing, waiting for the wake word
    Armed,
    /// Wake word heard, treating speech as a question
    Listening,
    /// Handing a question to the submit callback
    Submitting,
    /// Capture stop requested, waiting for the stream to end
    Stopping,
}

impl ControllerState {
    /// Whether the microphone indicator should show as recording
    #[must_use]
    pub const fn is_listening(self) -> bool {
        matches!(self, Self::Armed | Self::Listening | Self::Submitting)
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Armed => "armed",
            Self::Listening => "listening",
            Self::Submitting => "submitting",
            Self::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Why capture is being stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// User pressed the microphone toggle
    User,
    /// Silence watchdog expired
    Silence,
    /// Engine ended or failed on its own
    Engine,
}

/// One recognition result, replaced wholesale on every new result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    /// Transcript portion belonging to the current utterance
    pub text: String,
    /// When the result arrived
    pub received_at: Instant,
}

/// What the UI renders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerSnapshot {
    /// Current controller state
    pub state: ControllerState,
    /// Live question text
    pub question: String,
    /// Recording indicator
    pub listening: bool,
    /// Send button disabled
    pub send_disabled: bool,
}
