//! Events consumed by the input controller
//!
//! Engine callbacks, timer expiries and UI actions are all normalized into
//! [`ControllerEvent`] and applied in arrival order from a single queue.

use tokio::sync::mpsc;

use super::keys::KeyInput;

/// Sending half of the controller's event queue
pub type EventSender = mpsc::UnboundedSender<ControllerEvent>;

/// Receiving half of the controller's event queue
pub type EventReceiver = mpsc::UnboundedReceiver<ControllerEvent>;

/// Identifies one scheduled timer
///
/// A timer only takes effect while its ticket is still the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerTicket(pub(crate) u64);

/// Identifies one recognition stream started by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionEpoch(pub(crate) u64);

/// Lifecycle and result notifications from a speech engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Capture began
    Started,
    /// Full cumulative transcript of the stream so far
    Result(String),
    /// Capture ended
    Ended,
    /// Engine failed; before any `Started` or `Result` this means capture
    /// never began
    Error(String),
}

/// Everything the controller reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// Turn capture on
    Enable,
    /// Microphone button pressed
    ToggleMicrophone,
    /// Notification from the recognition stream `epoch`
    Session {
        /// Stream the event belongs to
        epoch: SessionEpoch,
        /// What happened
        event: SessionEvent,
    },
    /// Silence watchdog expired
    SilenceElapsed(TimerTicket),
    /// Submission debounce expired for `text`
    DebounceElapsed {
        /// Schedule that expired
        ticket: TimerTicket,
        /// Text captured when the debounce was scheduled
        text: String,
    },
    /// User replaced the question text
    QuestionEdited(String),
    /// Manual send of the live question text
    SendQuestion,
    /// Key pressed in the question field or on the send button
    KeyDown(KeyInput),
    /// Host enabled or disabled the input widget
    SetDisabled(bool),
    /// Host switched conversations
    SetConversationId(Option<String>),
    /// Playback state changed
    PlaybackChanged,
    /// The spoken answer finished
    AnswerComplete,
    /// Controller is being unmounted
    Shutdown,
}

/// Handle given to a speech engine for reporting its events
///
/// Every event is tagged with the epoch of the stream it was issued for so
/// late events from a finished stream can be told apart.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    epoch: SessionEpoch,
    tx: EventSender,
}

impl SessionEvents {
    pub(crate) const fn new(epoch: SessionEpoch, tx: EventSender) -> Self {
        Self { epoch, tx }
    }

    /// Epoch of the stream these events belong to
    #[must_use]
    pub const fn epoch(&self) -> SessionEpoch {
        self.epoch
    }

    /// Report that capture started
    pub fn started(&self) {
        self.emit(SessionEvent::Started);
    }

    /// Report the cumulative transcript
    pub fn result(&self, transcript: impl Into<String>) {
        self.emit(SessionEvent::Result(transcript.into()));
    }

    /// Report that capture ended
    pub fn ended(&self) {
        self.emit(SessionEvent::Ended);
    }

    /// Report an engine failure
    pub fn error(&self, message: impl Into<String>) {
        self.emit(SessionEvent::Error(message.into()));
    }

    fn emit(&self, event: SessionEvent) {
        let event = ControllerEvent::Session {
            epoch: self.epoch,
            event,
        };
        if self.tx.send(event).is_err() {
            tracing::trace!("controller gone, dropping session event");
        }
    }
}
