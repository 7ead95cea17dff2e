//! Energy-based speech segmentation
//!
//! Splits the microphone stream into phrases: speech onset when a chunk's RMS
//! energy crosses the threshold, phrase end after a run of silence.

use super::SAMPLE_RATE;

/// Minimum voiced samples for a phrase (0.3 seconds at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Trailing silence that ends a phrase (0.5 seconds)
const SILENCE_SAMPLES: usize = 8000;

/// Longest phrase before it is cut (30 seconds)
const MAX_SEGMENT_SAMPLES: usize = SAMPLE_RATE as usize * 30;

/// Segmenter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Waiting for speech
    Idle,
    /// Accumulating a phrase
    Speech,
}

/// Splits audio into speech segments
pub struct SpeechSegmenter {
    threshold: f32,
    state: SegmenterState,
    buffer: Vec<f32>,
    voiced: usize,
    silence: usize,
}

impl SpeechSegmenter {
    /// Create a segmenter with an RMS speech threshold
    #[must_use]
    pub const fn new(threshold: f32) -> Self {
        Self {
            threshold,
            state: SegmenterState::Idle,
            buffer: Vec::new(),
            voiced: 0,
            silence: 0,
        }
    }

    /// Feed a chunk; returns a finished phrase when one completes
    pub fn process(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        if samples.is_empty() {
            return None;
        }

        let energy = rms(samples);
        let is_speech = energy > self.threshold;

        match self.state {
            SegmenterState::Idle => {
                if is_speech {
                    self.state = SegmenterState::Speech;
                    self.buffer.clear();
                    self.buffer.extend_from_slice(samples);
                    self.voiced = samples.len();
                    self.silence = 0;
                    tracing::trace!(energy, "speech onset");
                }
                None
            }
            SegmenterState::Speech => {
                self.buffer.extend_from_slice(samples);

                if is_speech {
                    self.voiced += samples.len();
                    self.silence = 0;
                } else {
                    self.silence += samples.len();
                }

                if self.silence > SILENCE_SAMPLES && self.voiced > MIN_SPEECH_SAMPLES {
                    tracing::debug!(samples = self.buffer.len(), "speech segment complete");
                    return self.take();
                }

                if self.buffer.len() >= MAX_SEGMENT_SAMPLES {
                    tracing::debug!("speech segment cut at maximum length");
                    return self.take();
                }

                if self.silence > SILENCE_SAMPLES * 2 {
                    tracing::trace!("too little speech, discarding");
                    self.reset();
                }

                None
            }
        }
    }

    /// End of stream: return the phrase in progress if it has enough speech
    pub fn flush(&mut self) -> Option<Vec<f32>> {
        if self.state == SegmenterState::Speech && self.voiced > MIN_SPEECH_SAMPLES {
            return self.take();
        }
        self.reset();
        None
    }

    /// Drop any phrase in progress
    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
        self.buffer.clear();
        self.voiced = 0;
        self.silence = 0;
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SegmenterState {
        self.state
    }

    /// Samples buffered for the phrase in progress
    #[must_use]
    pub const fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn take(&mut self) -> Option<Vec<f32>> {
        let segment = std::mem::take(&mut self.buffer);
        self.reset();
        Some(segment)
    }
}

/// RMS energy of audio samples
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
