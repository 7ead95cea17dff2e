//! Voice question input controller
//!
//! Turns a continuous speech stream into discrete submitted questions.
//!
//! ```text
//!   engine ──► SessionEvents ─┐
//!   watchdog / debounce ──────┼──► event queue ──► InputController ──► SubmitSink
//!   UI (ControllerHandle) ────┘                         │
//!                                                       ├──► PlaybackBridge
//!                                                       └──► watch<ControllerSnapshot>
//! ```
//!
//! Every input is a [`ControllerEvent`] applied by one owner in arrival
//! order, so handlers always see the authoritative state.

mod debounce;
mod events;
mod keys;
mod playback;
mod session;
mod state;
mod submit;
mod timer;
mod transcript;
mod watchdog;
pub mod wake_word;

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use debounce::SubmissionDebouncer;
pub use events::{
    ControllerEvent, EventReceiver, EventSender, SessionEpoch, SessionEvent, SessionEvents,
    TimerTicket,
};
pub use keys::{Key, KeyInput, KeyTarget, submit_on_key};
pub use playback::{PlaybackBridge, PlaybackState, SharedPlayback};
pub use session::{
    CaptureOptions, RecognitionSession, SessionStatus, SpeechEngine, StartOutcome,
};
pub use state::{ControllerSnapshot, ControllerState, StopReason, Utterance};
pub use submit::{Question, SubmitSink, SubmitSource};
pub use watchdog::SilenceWatchdog;

use crate::config::InputConfig;
use transcript::ConsumedPrefix;

/// External collaborators the controller drives
pub struct Collaborators {
    /// Speech engine; `None` when capture is unavailable on this host
    pub engine: Option<Box<dyn SpeechEngine>>,
    /// Answer playback owned by the host
    pub playback: Arc<dyn PlaybackBridge>,
    /// Receives submitted questions
    pub submit: Box<dyn SubmitSink>,
}

/// Whether the event loop should keep running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep consuming events
    Continue,
    /// Controller was unmounted
    Shutdown,
}

/// The input controller state machine
pub struct InputController {
    config: InputConfig,
    state: ControllerState,
    events: EventSender,
    session: RecognitionSession,
    watchdog: SilenceWatchdog,
    debouncer: SubmissionDebouncer,
    playback: Arc<dyn PlaybackBridge>,
    submit: Box<dyn SubmitSink>,
    snapshot: watch::Sender<ControllerSnapshot>,

    /// Live question text
    question: String,
    /// Latest utterance seen by the controller
    utterance: Option<Utterance>,
    /// Raw transcript of the last accepted result
    last_transcript: Option<String>,
    /// Cumulative transcript prefix that was already submitted
    consumed: ConsumedPrefix,
    /// Current utterance has been submitted
    utterance_submitted: bool,
    /// Reason for the pending stop
    stop_reason: Option<StopReason>,
    /// Capture ended during playback and restarts once it stops
    restart_pending: bool,
    /// Playback was paused by the controller when listening started
    paused_playback: bool,
    /// Host disabled the widget
    disabled: bool,
    conversation_id: Option<String>,
}

impl InputController {
    /// Create a controller and the receiving end of its event queue
    #[must_use]
    pub fn new(config: InputConfig, collaborators: Collaborators) -> (Self, EventReceiver) {
        let (events, rx) = tokio::sync::mpsc::unbounded_channel();
        let (snapshot, _) = watch::channel(ControllerSnapshot {
            send_disabled: true,
            ..ControllerSnapshot::default()
        });

        let controller = Self {
            conversation_id: config.conversation_id.clone(),
            config,
            state: ControllerState::Idle,
            session: RecognitionSession::new(collaborators.engine, events.clone()),
            watchdog: SilenceWatchdog::new(events.clone()),
            debouncer: SubmissionDebouncer::new(events.clone()),
            events,
            playback: collaborators.playback,
            submit: collaborators.submit,
            snapshot,
            question: String::new(),
            utterance: None,
            last_transcript: None,
            consumed: ConsumedPrefix::default(),
            utterance_submitted: false,
            stop_reason: None,
            restart_pending: false,
            paused_playback: false,
            disabled: false,
        };

        (controller, rx)
    }

    /// Sender for posting events to this controller
    #[must_use]
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    /// Observe snapshots published after every event
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.snapshot.subscribe()
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> ControllerState {
        self.state
    }

    /// Live question text
    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Latest utterance
    #[must_use]
    pub const fn utterance(&self) -> Option<&Utterance> {
        self.utterance.as_ref()
    }

    /// Whether the recording indicator is lit
    #[must_use]
    pub const fn is_listening(&self) -> bool {
        self.state.is_listening()
    }

    /// Whether a deferred restart is waiting for playback to stop
    #[must_use]
    pub const fn restart_pending(&self) -> bool {
        self.restart_pending
    }

    /// Whether the send button is disabled
    #[must_use]
    pub fn send_disabled(&self) -> bool {
        self.disabled || self.question.trim().is_empty()
    }

    /// Silence watchdog, for inspection
    #[must_use]
    pub const fn watchdog(&self) -> &SilenceWatchdog {
        &self.watchdog
    }

    /// Submission debouncer, for inspection
    #[must_use]
    pub const fn debouncer(&self) -> &SubmissionDebouncer {
        &self.debouncer
    }

    /// Recognition session, for inspection
    #[must_use]
    pub const fn session(&self) -> &RecognitionSession {
        &self.session
    }

    /// What the UI should render
    #[must_use]
    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            state: self.state,
            question: self.question.clone(),
            listening: self.is_listening(),
            send_disabled: self.send_disabled(),
        }
    }

    /// Initial transition on mount: `Armed` with auto-listen, else `Idle`
    pub fn mount(&mut self) {
        if self.config.auto_listen {
            self.enable();
        }
        self.publish();
    }

    /// Consume events until shutdown
    pub async fn run(mut self, mut events: EventReceiver) {
        self.mount();

        while let Some(event) = events.recv().await {
            if self.handle(event) == Flow::Shutdown {
                break;
            }
        }

        self.teardown();
    }

    /// Apply one event
    pub fn handle(&mut self, event: ControllerEvent) -> Flow {
        tracing::trace!(state = %self.state, ?event, "controller event");

        let flow = match event {
            ControllerEvent::Enable => {
                self.enable();
                Flow::Continue
            }
            ControllerEvent::ToggleMicrophone => {
                self.toggle_microphone();
                Flow::Continue
            }
            ControllerEvent::Session { epoch, event } => {
                self.on_session_event(epoch, event);
                Flow::Continue
            }
            ControllerEvent::SilenceElapsed(ticket) => {
                self.on_silence(ticket);
                Flow::Continue
            }
            ControllerEvent::DebounceElapsed { ticket, text } => {
                self.on_debounce(ticket, text);
                Flow::Continue
            }
            ControllerEvent::QuestionEdited(text) => {
                self.question = text;
                Flow::Continue
            }
            ControllerEvent::SendQuestion => {
                self.send_manual();
                Flow::Continue
            }
            ControllerEvent::KeyDown(key) => {
                if submit_on_key(&key) {
                    self.send_manual();
                }
                Flow::Continue
            }
            ControllerEvent::SetDisabled(disabled) => {
                self.disabled = disabled;
                Flow::Continue
            }
            ControllerEvent::SetConversationId(id) => {
                self.conversation_id = id;
                Flow::Continue
            }
            ControllerEvent::PlaybackChanged => {
                self.on_playback_changed();
                Flow::Continue
            }
            ControllerEvent::AnswerComplete => {
                self.on_answer_complete();
                Flow::Continue
            }
            ControllerEvent::Shutdown => {
                self.teardown();
                Flow::Shutdown
            }
        };

        self.publish();
        flow
    }

    fn set_state(&mut self, next: ControllerState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "controller transition");
            self.state = next;
        }
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.snapshot());
    }

    fn enable(&mut self) {
        if self.state != ControllerState::Idle {
            tracing::debug!(state = %self.state, "enable ignored, capture already on");
            return;
        }

        self.stop_reason = None;
        self.restart_pending = false;
        self.start_capture();
    }

    fn toggle_microphone(&mut self) {
        match self.state {
            ControllerState::Idle => self.enable(),
            ControllerState::Stopping => {
                // Already stopping; make sure it stays off
                self.stop_reason = Some(StopReason::User);
                self.restart_pending = false;
            }
            _ => self.request_stop(StopReason::User),
        }
    }

    fn start_capture(&mut self) -> bool {
        match self.session.start() {
            StartOutcome::Started => {
                self.last_transcript = None;
                self.consumed.clear();
                self.utterance = None;
            }
            StartOutcome::AlreadyRunning => {}
            StartOutcome::Unavailable => {
                tracing::debug!("no speech engine, voice input unavailable");
                return false;
            }
            StartOutcome::Failed => return false,
        }

        self.watchdog.arm(self.config.silence_timeout);
        self.set_state(ControllerState::Armed);
        true
    }

    fn request_stop(&mut self, reason: StopReason) {
        self.watchdog.disarm();

        if reason == StopReason::User {
            self.debouncer.cancel();
        } else {
            self.flush_pending();
        }

        self.stop_reason = Some(reason);
        self.session.stop();
        self.set_state(ControllerState::Stopping);
    }

    fn on_session_event(&mut self, epoch: SessionEpoch, event: SessionEvent) {
        let opening = self.session.status() == SessionStatus::Starting;
        if !self.session.observe(epoch, &event) {
            return;
        }

        match event {
            SessionEvent::Started => tracing::debug!("capture started"),
            SessionEvent::Result(transcript) => self.on_result(transcript),
            SessionEvent::Ended => self.on_stream_end(),
            SessionEvent::Error(message) if opening => self.on_open_failed(&message),
            SessionEvent::Error(message) => {
                tracing::warn!(error = %message, "recognition error, treating as end of stream");
                self.on_stream_end();
            }
        }
    }

    /// The engine could not begin capturing; same outcome as a refused start
    fn on_open_failed(&mut self, message: &str) {
        tracing::warn!(error = %message, "speech engine failed to start");
        self.watchdog.disarm();
        self.debouncer.cancel();
        self.stop_reason = None;
        self.restart_pending = false;
        self.set_state(ControllerState::Idle);
    }

    fn on_result(&mut self, transcript: String) {
        if transcript.trim().is_empty() || self.last_transcript.as_deref() == Some(&transcript) {
            tracing::trace!("empty or repeated transcript ignored");
            return;
        }

        let fresh = self.consumed.fresh(&transcript);
        self.last_transcript = Some(transcript);
        if fresh.is_empty() {
            return;
        }

        self.utterance = Some(Utterance {
            text: fresh.clone(),
            received_at: Instant::now(),
        });

        match self.state {
            ControllerState::Armed => self.on_passive_result(&fresh),
            ControllerState::Listening => self.on_command_result(&fresh),
            state => tracing::trace!(%state, "result ignored in this state"),
        }
    }

    fn on_passive_result(&mut self, fresh: &str) {
        if !wake_word::matches(fresh, &self.config.wake_word) {
            self.watchdog.arm(self.config.silence_timeout);
            return;
        }

        let playback = self.playback.state();
        if playback.is_active() {
            tracing::debug!("wake word ignored while an answer is playing");
            self.watchdog.arm(self.config.silence_timeout);
            return;
        }

        self.playback.pause();
        self.paused_playback = playback.is_playing;

        self.watchdog.disarm();
        self.watchdog.arm(self.config.silence_timeout);
        self.utterance_submitted = false;
        self.set_state(ControllerState::Listening);
        tracing::info!(wake_word = %self.config.wake_word, "wake word detected");

        let command = wake_word::extract_command(fresh, &self.config.wake_word);
        if !command.is_empty() {
            self.question.clone_from(&command);
            self.debouncer.schedule(command, self.config.submit_delay);
        }
    }

    fn on_command_result(&mut self, fresh: &str) {
        self.watchdog.arm(self.config.silence_timeout);

        let command = wake_word::extract_command(fresh, &self.config.wake_word);
        if command.is_empty() {
            return;
        }

        self.question.clone_from(&command);
        self.utterance_submitted = false;
        self.debouncer.schedule(command, self.config.submit_delay);
    }

    fn on_debounce(&mut self, ticket: TimerTicket, text: String) {
        if !self.debouncer.claim(ticket) {
            tracing::trace!(?ticket, "superseded submission ignored");
            return;
        }
        if self.state != ControllerState::Listening {
            tracing::debug!(state = %self.state, "debounced submission outside listening dropped");
            return;
        }
        if text.trim().is_empty() {
            return;
        }

        self.submit_voice(text);
    }

    /// Submit the pending utterance now instead of waiting for the debounce
    fn flush_pending(&mut self) {
        if let Some(text) = self.debouncer.take_pending() {
            if self.state == ControllerState::Listening && !text.trim().is_empty() {
                self.submit_voice(text);
            }
        }
    }

    fn submit_voice(&mut self, text: String) {
        if self.utterance_submitted {
            tracing::debug!("utterance already submitted");
        } else if self.disabled {
            tracing::debug!("input disabled, voice question dropped");
        } else {
            self.set_state(ControllerState::Submitting);
            self.dispatch(text, SubmitSource::Voice);
        }
        self.end_utterance();
    }

    fn send_manual(&mut self) {
        if self.disabled || self.question.trim().is_empty() {
            tracing::debug!(disabled = self.disabled, "manual send ignored");
            return;
        }

        let text = self.question.clone();
        if self.state == ControllerState::Listening {
            self.debouncer.cancel();
            self.set_state(ControllerState::Submitting);
            self.dispatch(text, SubmitSource::Manual);
            self.end_utterance();
        } else {
            self.dispatch(text, SubmitSource::Manual);
        }
    }

    fn dispatch(&mut self, text: String, source: SubmitSource) {
        tracing::info!(question = %text, ?source, "submitting question");

        self.submit.submit(Question {
            text,
            conversation_id: self.conversation_id.clone(),
            source,
        });
        self.utterance_submitted = true;

        if self.config.clear_on_send {
            self.question.clear();
        }
    }

    /// Close the current utterance and go back to waiting for the wake word
    fn end_utterance(&mut self) {
        if let Some(transcript) = &self.last_transcript {
            self.consumed.set(transcript);
        }
        self.utterance = None;

        if matches!(
            self.state,
            ControllerState::Listening | ControllerState::Submitting
        ) {
            self.set_state(ControllerState::Armed);
        }
    }

    fn on_silence(&mut self, ticket: TimerTicket) {
        if !self.watchdog.claim(ticket) {
            tracing::trace!(?ticket, "stale silence timer ignored");
            return;
        }

        if matches!(
            self.state,
            ControllerState::Armed | ControllerState::Listening
        ) {
            tracing::info!(
                timeout_ms = self.config.silence_timeout.as_millis(),
                "no speech, stopping capture"
            );
            self.request_stop(StopReason::Silence);
        }
    }

    fn on_stream_end(&mut self) {
        self.watchdog.disarm();
        let reason = self.stop_reason.take().unwrap_or(StopReason::Engine);

        if reason == StopReason::User {
            self.debouncer.cancel();
            self.restart_pending = false;
            self.set_state(ControllerState::Idle);
            tracing::info!("capture stopped");
            return;
        }

        self.flush_pending();
        self.set_state(ControllerState::Idle);

        if self.playback.state().is_active() {
            tracing::debug!("answer playing, restart deferred");
            self.restart_pending = true;
        } else {
            tracing::debug!(?reason, "restarting capture");
            self.start_capture();
        }
    }

    fn on_playback_changed(&mut self) {
        if !self.restart_pending || self.state != ControllerState::Idle {
            return;
        }
        if self.playback.state().is_active() {
            return;
        }

        tracing::debug!("playback stopped, resuming capture");
        self.restart_pending = false;
        self.start_capture();
    }

    fn on_answer_complete(&mut self) {
        if self.paused_playback {
            self.paused_playback = false;
            self.playback.resume();
        }
        self.on_playback_changed();
    }

    /// Cancel every timer and end capture
    fn teardown(&mut self) {
        self.debouncer.cancel();
        self.watchdog.disarm();
        self.session.abort();
        self.restart_pending = false;
        self.stop_reason = None;
        self.set_state(ControllerState::Idle);
    }
}

/// Cloneable UI-side handle to a running controller
#[derive(Clone)]
pub struct ControllerHandle {
    events: EventSender,
    snapshot: watch::Receiver<ControllerSnapshot>,
}

impl ControllerHandle {
    /// Turn capture on
    pub fn enable(&self) {
        self.post(ControllerEvent::Enable);
    }

    /// Microphone button
    pub fn toggle_microphone(&self) {
        self.post(ControllerEvent::ToggleMicrophone);
    }

    /// Replace the live question text
    pub fn edit_question(&self, text: impl Into<String>) {
        self.post(ControllerEvent::QuestionEdited(text.into()));
    }

    /// Submit the live question text
    pub fn submit(&self) {
        self.post(ControllerEvent::SendQuestion);
    }

    /// Set the question text and submit it
    pub fn send_question(&self, text: impl Into<String>) {
        self.edit_question(text);
        self.submit();
    }

    /// Forward a key press; returns true if it triggers a submission
    pub fn key_down(&self, key: KeyInput) -> bool {
        let submits = submit_on_key(&key);
        self.post(ControllerEvent::KeyDown(key));
        submits
    }

    /// Enable or disable the widget
    pub fn set_disabled(&self, disabled: bool) {
        self.post(ControllerEvent::SetDisabled(disabled));
    }

    /// Switch the conversation questions are attached to
    pub fn set_conversation_id(&self, id: Option<String>) {
        self.post(ControllerEvent::SetConversationId(id));
    }

    /// Notify that playback state changed
    pub fn playback_changed(&self) {
        self.post(ControllerEvent::PlaybackChanged);
    }

    /// Notify that the spoken answer finished
    pub fn answer_complete(&self) {
        self.post(ControllerEvent::AnswerComplete);
    }

    /// Unmount the controller
    pub fn shutdown(&self) {
        self.post(ControllerEvent::Shutdown);
    }

    /// Latest published snapshot
    #[must_use]
    pub fn snapshot(&self) -> ControllerSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every published snapshot
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.snapshot.clone()
    }

    fn post(&self, event: ControllerEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("controller stopped, event dropped");
        }
    }
}

/// Spawn a controller task
///
/// Must be called from within a tokio runtime. The task runs until
/// [`ControllerHandle::shutdown`].
#[must_use]
pub fn spawn(config: InputConfig, collaborators: Collaborators) -> (ControllerHandle, JoinHandle<()>) {
    let (controller, rx) = InputController::new(config, collaborators);
    let handle = ControllerHandle {
        events: controller.events(),
        snapshot: controller.subscribe(),
    };
    let task = tokio::spawn(controller.run(rx));
    (handle, task)
}
