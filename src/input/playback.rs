//! Bridge to the answer playback owned by the host
//!
//! The controller only reads snapshots and issues pause/resume requests; it
//! never assumes a request has taken effect by the time the call returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Snapshot of the host's playback state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackState {
    /// An answer is being read aloud
    pub is_playing: bool,
    /// Audio output is turned off by the user
    pub is_disabled: bool,
}

impl PlaybackState {
    /// Whether playback is audible and must not be talked over
    ///
    /// Muted playback does not count: it neither blocks the wake word nor
    /// defers a capture restart, even while `is_playing` is set.
    #[must_use]
    pub const fn is_active(self) -> bool {
        self.is_playing && !self.is_disabled
    }
}

/// Playback controls consumed by the input controller
pub trait PlaybackBridge: Send + Sync {
    /// Current playback state
    fn state(&self) -> PlaybackState;

    /// Request playback to pause
    fn pause(&self);

    /// Request playback to resume
    fn resume(&self);
}

/// Playback state shared between the host and the controller
///
/// Clones share the same flags. `pause`/`resume` flip the playing flag, which
/// is enough for hosts without an audio pipeline of their own.
#[derive(Debug, Clone, Default)]
pub struct SharedPlayback {
    playing: Arc<AtomicBool>,
    disabled: Arc<AtomicBool>,
}

impl SharedPlayback {
    /// Create with playback stopped and enabled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an answer as playing or finished
    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }

    /// Mute or unmute answer playback
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }
}

impl PlaybackBridge for SharedPlayback {
    fn state(&self) -> PlaybackState {
        PlaybackState {
            is_playing: self.playing.load(Ordering::SeqCst),
            is_disabled: self.disabled.load(Ordering::SeqCst),
        }
    }

    fn pause(&self) {
        tracing::debug!("pausing answer playback");
        self.playing.store(false, Ordering::SeqCst);
    }

    fn resume(&self) {
        tracing::debug!("resuming answer playback");
        self.playing.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_audio_is_not_active() {
        let state = PlaybackState {
            is_playing: true,
            is_disabled: true,
        };
        assert!(!state.is_active());
    }

    #[test]
    fn test_shared_flags() {
        let host = SharedPlayback::new();
        let bridge = host.clone();

        host.set_playing(true);
        assert!(bridge.state().is_active());

        bridge.pause();
        assert!(!host.state().is_playing);
    }
}
