//! Shared test utilities

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use voice_ask::config::InputConfig;
use voice_ask::input::{
    CaptureOptions, Collaborators, ControllerEvent, EventReceiver, InputController,
    PlaybackBridge, PlaybackState, Question, SessionEvents, SpeechEngine,
};
use voice_ask::{Error, Result};

#[derive(Default)]
struct EngineLog {
    starts: usize,
    stops: usize,
    aborts: usize,
    fail_start: bool,
    fail_open: bool,
    events: Option<SessionEvents>,
}

/// Test-side view of a [`FakeEngine`]
///
/// Lets a test play the speech engine: emit results, end the stream, and
/// count the calls the controller made.
#[derive(Clone, Default)]
pub struct EngineProbe(Arc<Mutex<EngineLog>>);

impl EngineProbe {
    /// Engine wired to this probe
    pub fn engine(&self) -> Box<dyn SpeechEngine> {
        Box::new(FakeEngine(self.clone()))
    }

    pub fn starts(&self) -> usize {
        self.0.lock().unwrap().starts
    }

    pub fn stops(&self) -> usize {
        self.0.lock().unwrap().stops
    }

    pub fn aborts(&self) -> usize {
        self.0.lock().unwrap().aborts
    }

    /// Make subsequent starts fail like a denied microphone
    pub fn fail_start(&self, fail: bool) {
        self.0.lock().unwrap().fail_start = fail;
    }

    /// Make subsequent starts return at once and then report that the
    /// device could not be opened
    pub fn fail_open(&self, fail: bool) {
        self.0.lock().unwrap().fail_open = fail;
    }

    /// Emit a cumulative transcript on the current stream
    pub fn result(&self, transcript: &str) {
        self.with_events(|events| events.result(transcript));
    }

    /// End the current stream
    pub fn end(&self) {
        self.with_events(SessionEvents::ended);
    }

    /// Fail the current stream
    pub fn error(&self, message: &str) {
        self.with_events(|events| events.error(message));
    }

    /// Events handle of the current stream
    pub fn current_events(&self) -> SessionEvents {
        self.0
            .lock()
            .unwrap()
            .events
            .clone()
            .expect("engine was never started")
    }

    fn with_events(&self, f: impl FnOnce(&SessionEvents)) {
        let events = self.current_events();
        f(&events);
    }
}

/// Scriptable speech engine
pub struct FakeEngine(EngineProbe);

impl SpeechEngine for FakeEngine {
    fn start(&mut self, options: CaptureOptions, events: SessionEvents) -> Result<()> {
        assert!(options.continuous, "capture must be continuous");

        let mut log = (self.0).0.lock().unwrap();
        if log.fail_start {
            return Err(Error::Engine("microphone permission denied".to_string()));
        }

        log.starts += 1;
        if log.fail_open {
            events.error("no input device available");
        } else {
            events.started();
        }
        log.events = Some(events);
        Ok(())
    }

    fn stop(&mut self) {
        (self.0).0.lock().unwrap().stops += 1;
    }

    fn abort(&mut self) {
        (self.0).0.lock().unwrap().aborts += 1;
    }
}

/// Playback bridge that records pause and resume requests
#[derive(Default)]
pub struct RecordingPlayback {
    playing: AtomicBool,
    disabled: AtomicBool,
    pauses: AtomicUsize,
    resumes: AtomicUsize,
}

impl RecordingPlayback {
    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }
}

impl PlaybackBridge for RecordingPlayback {
    fn state(&self) -> PlaybackState {
        PlaybackState {
            is_playing: self.playing.load(Ordering::SeqCst),
            is_disabled: self.disabled.load(Ordering::SeqCst),
        }
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        self.playing.store(true, Ordering::SeqCst);
    }
}

/// Default controller configuration: wake word "gomez", 8s silence, 2.5s delay
pub fn config() -> InputConfig {
    InputConfig::default()
}

/// Controller driven synchronously by the test
///
/// Run under `#[tokio::test(start_paused = true)]`; timers only fire when the
/// test advances the clock.
pub struct Harness {
    pub controller: InputController,
    pub engine: EngineProbe,
    pub playback: Arc<RecordingPlayback>,
    rx: EventReceiver,
    questions: mpsc::UnboundedReceiver<Question>,
}

impl Harness {
    /// Controller with a fake engine, mounted
    pub fn new(config: InputConfig) -> Self {
        Self::build(config, true)
    }

    /// Controller on a host without speech capture, mounted
    pub fn without_engine(config: InputConfig) -> Self {
        Self::build(config, false)
    }

    fn build(config: InputConfig, with_engine: bool) -> Self {
        let engine = EngineProbe::default();
        let playback = Arc::new(RecordingPlayback::default());
        let (question_tx, questions) = mpsc::unbounded_channel();

        let (mut controller, rx) = InputController::new(
            config,
            Collaborators {
                engine: with_engine.then(|| engine.engine()),
                playback: Arc::clone(&playback) as Arc<dyn PlaybackBridge>,
                submit: Box::new(question_tx),
            },
        );
        controller.mount();

        let mut harness = Self {
            controller,
            engine,
            playback,
            rx,
            questions,
        };
        harness.drain();
        harness
    }

    /// Apply an event and everything it queued
    pub fn send(&mut self, event: ControllerEvent) {
        self.controller.handle(event);
        self.drain();
    }

    /// Apply every queued event
    pub fn drain(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.controller.handle(event);
        }
    }

    /// Let timer tasks that are due run, then apply what they queued
    pub async fn settle(&mut self) {
        for _ in 0..8 {
            tokio::task::yield_now().await;
            self.drain();
        }
    }

    /// Advance the paused clock
    pub async fn advance(&mut self, by: Duration) {
        tokio::time::sleep(by).await;
        self.settle().await;
    }

    /// Emit a transcript and apply it
    pub fn hear(&mut self, transcript: &str) {
        self.engine.result(transcript);
        self.drain();
    }

    /// End the current stream and apply it
    pub fn end_stream(&mut self) {
        self.engine.end();
        self.drain();
    }

    /// Questions submitted so far
    pub fn submitted(&mut self) -> Vec<Question> {
        let mut out = Vec::new();
        while let Ok(question) = self.questions.try_recv() {
            out.push(question);
        }
        out
    }
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
