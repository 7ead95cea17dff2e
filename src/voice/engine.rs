//! Microphone speech engine
//!
//! Bridges the blocking cpal capture to the controller's event queue:
//!
//! ```text
//! capture thread ──► SpeechSegmenter ──► segment channel ──► transcriber task
//!  (AudioCapture)     (energy VAD)                            │
//!                                                             ▼
//!                                        SessionEvents::result(cumulative)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::capture::{AudioCapture, SAMPLE_RATE, encode_wav};
use super::segmenter::SpeechSegmenter;
use super::stt::Transcriber;
use crate::input::{CaptureOptions, SessionEvents, SpeechEngine};
use crate::Result;

/// How often the capture thread drains the device buffer
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Work item passed from the capture thread to the transcriber task
#[derive(Debug)]
pub(crate) enum Segment {
    /// A finished phrase
    Audio(Vec<f32>),
    /// The device could not be opened, or its stream broke
    Failed(String),
}

#[derive(Default)]
struct CaptureControl {
    stop: AtomicBool,
    abort: AtomicBool,
}

struct RunningCapture {
    control: Arc<CaptureControl>,
    worker: JoinHandle<()>,
}

/// [`SpeechEngine`] backed by the default microphone and an STT endpoint
pub struct MicrophoneEngine {
    transcriber: Arc<dyn Transcriber>,
    energy_threshold: f32,
    running: Option<RunningCapture>,
}

impl MicrophoneEngine {
    /// Create an engine; the device is opened on `start`
    #[must_use]
    pub fn new(transcriber: Arc<dyn Transcriber>, energy_threshold: f32) -> Self {
        Self {
            transcriber,
            energy_threshold,
            running: None,
        }
    }

    /// Open the device and run the capture loop on a dedicated thread
    ///
    /// Returns as soon as the thread is spawned. The thread reports
    /// `started` once the device is open, or a failed segment if it cannot
    /// be opened.
    fn spawn_capture(
        &self,
        options: CaptureOptions,
        control: Arc<CaptureControl>,
        segments: mpsc::UnboundedSender<Segment>,
        events: SessionEvents,
    ) -> Result<()> {
        let threshold = self.energy_threshold;

        std::thread::Builder::new()
            .name("voice-capture".to_string())
            .spawn(move || {
                let opened = AudioCapture::new().and_then(|mut capture| {
                    capture.start()?;
                    Ok(capture)
                });

                let mut capture = match opened {
                    Ok(capture) => capture,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to open microphone");
                        let _ = segments.send(Segment::Failed(e.to_string()));
                        return;
                    }
                };

                tracing::info!(device = %capture.device_name(), "microphone open");
                events.started();
                capture_loop(
                    &capture,
                    &mut SpeechSegmenter::new(threshold),
                    options,
                    &control,
                    &segments,
                );
                capture.stop();
            })?;

        Ok(())
    }
}

impl SpeechEngine for MicrophoneEngine {
    fn start(&mut self, options: CaptureOptions, events: SessionEvents) -> Result<()> {
        // A stream that failed on its own leaves its handles behind
        self.abort();

        let control = Arc::new(CaptureControl::default());
        let (segment_tx, segment_rx) = mpsc::unbounded_channel();

        self.spawn_capture(options, Arc::clone(&control), segment_tx, events.clone())?;

        let worker = tokio::spawn(transcribe_segments(
            segment_rx,
            Arc::clone(&self.transcriber),
            events,
        ));

        self.running = Some(RunningCapture { control, worker });
        Ok(())
    }

    fn stop(&mut self) {
        // The worker drains the last phrase and reports `ended` on its own
        if let Some(running) = self.running.take() {
            running.control.stop.store(true, Ordering::SeqCst);
        }
    }

    fn abort(&mut self) {
        if let Some(running) = self.running.take() {
            running.control.abort.store(true, Ordering::SeqCst);
            running.worker.abort();
        }
    }
}

impl Drop for MicrophoneEngine {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Poll the device until stopped, aborted, or broken
fn capture_loop(
    capture: &AudioCapture,
    segmenter: &mut SpeechSegmenter,
    options: CaptureOptions,
    control: &CaptureControl,
    segments: &mpsc::UnboundedSender<Segment>,
) {
    loop {
        std::thread::sleep(POLL_INTERVAL);

        if control.abort.load(Ordering::SeqCst) {
            tracing::debug!("capture aborted");
            return;
        }

        let samples = capture.take_buffer();

        if capture.has_failed() {
            let _ = segments.send(Segment::Failed("audio input stream failed".to_string()));
            return;
        }

        if let Some(segment) = segmenter.process(&samples) {
            if segments.send(Segment::Audio(segment)).is_err() {
                return;
            }
            if !options.continuous {
                return;
            }
        }

        if control.stop.load(Ordering::SeqCst) {
            if let Some(segment) = segmenter.flush() {
                let _ = segments.send(Segment::Audio(segment));
            }
            tracing::debug!("capture stopped");
            return;
        }
    }
}

/// Transcribe phrases in order and report the growing transcript
///
/// Reports `ended` once the capture side hangs up, or `error` if the input
/// stream broke.
pub(crate) async fn transcribe_segments(
    mut segments: mpsc::UnboundedReceiver<Segment>,
    transcriber: Arc<dyn Transcriber>,
    events: SessionEvents,
) {
    let mut transcript = String::new();

    while let Some(segment) = segments.recv().await {
        let samples = match segment {
            Segment::Audio(samples) => samples,
            Segment::Failed(message) => {
                events.error(message);
                return;
            }
        };

        let wav = match encode_wav(&samples, SAMPLE_RATE) {
            Ok(wav) => wav,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode segment");
                continue;
            }
        };

        match transcriber.transcribe(wav).await {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                if !transcript.is_empty() {
                    transcript.push(' ');
                }
                transcript.push_str(text);
                events.result(transcript.clone());
            }
            Err(e) => tracing::warn!(error = %e, "segment transcription failed"),
        }
    }

    events.ended();
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::Error;
    use crate::input::{ControllerEvent, SessionEpoch, SessionEvent};

    struct ScriptedTranscriber {
        replies: Mutex<Vec<Result<String>>>,
    }

    #[async_trait]
    impl Transcriber for ScriptedTranscriber {
        async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
            assert!(wav.starts_with(b"RIFF"));
            self.replies.lock().unwrap().remove(0)
        }
    }

    fn session_events(rx: &mut mpsc::UnboundedReceiver<ControllerEvent>) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ControllerEvent::Session { event, .. } = event {
                out.push(event);
            }
        }
        out
    }

    #[tokio::test]
    async fn test_transcript_is_cumulative() {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let events = SessionEvents::new(SessionEpoch(1), event_tx);
        let transcriber = Arc::new(ScriptedTranscriber {
            replies: Mutex::new(vec![
                Ok(" hey gomez ".to_string()),
                Ok(String::new()),
                Err(Error::Stt("timeout".to_string())),
                Ok("what time is it".to_string()),
            ]),
        });

        let (segment_tx, segment_rx) = mpsc::unbounded_channel();
        for _ in 0..4 {
            segment_tx.send(Segment::Audio(vec![0.1; 160])).unwrap();
        }
        drop(segment_tx);

        transcribe_segments(segment_rx, transcriber, events).await;

        assert_eq!(
            session_events(&mut event_rx),
            vec![
                SessionEvent::Result("hey gomez".to_string()),
                SessionEvent::Result("hey gomez what time is it".to_string()),
                SessionEvent::Ended,
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_failure_reports_error() {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let events = SessionEvents::new(SessionEpoch(1), event_tx);
        let transcriber = Arc::new(ScriptedTranscriber {
            replies: Mutex::new(Vec::new()),
        });

        let (segment_tx, segment_rx) = mpsc::unbounded_channel();
        segment_tx
            .send(Segment::Failed("device unplugged".to_string()))
            .unwrap();

        transcribe_segments(segment_rx, transcriber, events).await;

        assert_eq!(
            session_events(&mut event_rx),
            vec![SessionEvent::Error("device unplugged".to_string())]
        );
    }
}
