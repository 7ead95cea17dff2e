//! Recognition session
//!
//! Owns the lifecycle of the continuous speech-capture stream and filters
//! engine events down to the ones belonging to the live stream.

use super::events::{EventSender, SessionEpoch, SessionEvent, SessionEvents};
use crate::Result;

/// Options passed to the engine when capture starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Keep capturing across pauses instead of ending after one phrase
    pub continuous: bool,
}

/// A speech capture engine
///
/// Implementations report progress through the [`SessionEvents`] handed to
/// [`SpeechEngine::start`]. `on_result` must carry the full cumulative
/// transcript of the stream, not a delta.
pub trait SpeechEngine: Send {
    /// Begin capturing without blocking
    ///
    /// Engines that open their device asynchronously return `Ok` right away
    /// and report an open failure through [`SessionEvents::error`] before
    /// any `started` or `result`.
    ///
    /// # Errors
    ///
    /// Returns error if capture cannot begin (no device, no permission)
    fn start(&mut self, options: CaptureOptions, events: SessionEvents) -> Result<()>;

    /// Finish gracefully, delivering a final result before `ended`
    fn stop(&mut self);

    /// Finish immediately, discarding pending results
    fn abort(&mut self);
}

/// Lifecycle of the current stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No stream
    Stopped,
    /// `start` issued, `started` not yet observed
    Starting,
    /// Capturing
    Running,
    /// `stop` issued, `ended` not yet observed
    Stopping,
}

/// Result of [`RecognitionSession::start`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new stream was requested
    Started,
    /// A stream is already live; nothing was done
    AlreadyRunning,
    /// No engine available on this host
    Unavailable,
    /// The engine refused to start
    Failed,
}

/// Wraps a speech engine with idempotent start and stale-event filtering
pub struct RecognitionSession {
    engine: Option<Box<dyn SpeechEngine>>,
    events: EventSender,
    status: SessionStatus,
    epoch: u64,
}

impl RecognitionSession {
    /// Create a session; `None` means speech capture is unavailable
    #[must_use]
    pub fn new(engine: Option<Box<dyn SpeechEngine>>, events: EventSender) -> Self {
        if engine.is_none() {
            tracing::info!("speech capture unavailable, manual entry only");
        }

        Self {
            engine,
            events,
            status: SessionStatus::Stopped,
            epoch: 0,
        }
    }

    /// Whether an engine is present
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    /// Current stream status
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Epoch of the most recently started stream
    #[must_use]
    pub const fn epoch(&self) -> SessionEpoch {
        SessionEpoch(self.epoch)
    }

    /// Start continuous capture unless a stream is already live
    pub fn start(&mut self) -> StartOutcome {
        let Some(engine) = self.engine.as_mut() else {
            return StartOutcome::Unavailable;
        };

        if self.status != SessionStatus::Stopped {
            tracing::debug!(status = ?self.status, "session already live, start ignored");
            return StartOutcome::AlreadyRunning;
        }

        self.epoch += 1;
        let events = SessionEvents::new(SessionEpoch(self.epoch), self.events.clone());

        match engine.start(CaptureOptions { continuous: true }, events) {
            Ok(()) => {
                self.status = SessionStatus::Starting;
                tracing::debug!(epoch = self.epoch, "recognition session starting");
                StartOutcome::Started
            }
            Err(e) => {
                tracing::warn!(error = %e, "speech engine failed to start");
                StartOutcome::Failed
            }
        }
    }

    /// Request a graceful end of the live stream
    pub fn stop(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            if matches!(self.status, SessionStatus::Starting | SessionStatus::Running) {
                engine.stop();
                self.status = SessionStatus::Stopping;
                tracing::debug!(epoch = self.epoch, "recognition session stopping");
            }
        }
    }

    /// End the live stream immediately
    ///
    /// Events still in flight for the aborted stream are discarded.
    pub fn abort(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            if self.status != SessionStatus::Stopped {
                engine.abort();
                self.status = SessionStatus::Stopped;
                tracing::debug!(epoch = self.epoch, "recognition session aborted");
            }
        }
    }

    /// Apply an engine event to the session status
    ///
    /// Returns false for events the controller must ignore: events from an
    /// earlier stream, a repeated `started`, results after an abort, and
    /// an `ended` for a stream that already ended.
    pub fn observe(&mut self, epoch: SessionEpoch, event: &SessionEvent) -> bool {
        if epoch.0 != self.epoch {
            tracing::trace!(?epoch, current = self.epoch, "stale session event");
            return false;
        }

        match event {
            SessionEvent::Started => {
                if self.status == SessionStatus::Starting {
                    self.status = SessionStatus::Running;
                    true
                } else {
                    false
                }
            }
            SessionEvent::Result(_) => match self.status {
                SessionStatus::Starting => {
                    self.status = SessionStatus::Running;
                    true
                }
                SessionStatus::Running | SessionStatus::Stopping => true,
                SessionStatus::Stopped => false,
            },
            SessionEvent::Ended | SessionEvent::Error(_) => {
                if self.status == SessionStatus::Stopped {
                    false
                } else {
                    self.status = SessionStatus::Stopped;
                    true
                }
            }
        }
    }
}
