//! Submission debouncer
//!
//! Growing partial transcripts are held back until the speaker pauses. Only
//! the most recently scheduled text can ever fire, and it fires with the text
//! captured at schedule time rather than whatever the question field holds.

use std::time::Duration;

use super::events::{ControllerEvent, EventSender, TimerTicket};
use super::timer::TicketedTimer;

/// Last-write-wins delayed submission
pub struct SubmissionDebouncer {
    timer: TicketedTimer<String>,
}

impl SubmissionDebouncer {
    /// Create a debouncer posting expiries to `events`
    #[must_use]
    pub const fn new(events: EventSender) -> Self {
        Self {
            timer: TicketedTimer::new(events),
        }
    }

    /// Schedule `text` for submission after `delay`, superseding any pending schedule
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&mut self, text: impl Into<String>, delay: Duration) -> TimerTicket {
        let text = text.into();
        let fire_text = text.clone();
        tracing::trace!(text = %text, delay_ms = delay.as_millis(), "submission scheduled");

        self.timer.schedule(text, delay, move |ticket| {
            ControllerEvent::DebounceElapsed {
                ticket,
                text: fire_text,
            }
        })
    }

    /// Drop the pending submission, if any
    pub fn cancel(&mut self) {
        if let Some((ticket, _)) = self.timer.cancel() {
            tracing::trace!(?ticket, "submission cancelled");
        }
    }

    /// Cancel the pending timer and hand back its text
    pub fn take_pending(&mut self) -> Option<String> {
        self.timer.cancel().map(|(_, text)| text)
    }

    /// Text of the pending submission
    #[must_use]
    pub fn pending_text(&self) -> Option<&str> {
        self.timer.value().map(String::as_str)
    }

    /// Whether a submission is pending
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.timer.current().is_some()
    }

    /// Accept an expiry
    ///
    /// Returns true only if `ticket` is the pending schedule, which is then
    /// cleared. Superseded and cancelled schedules are rejected.
    pub fn claim(&mut self, ticket: TimerTicket) -> bool {
        self.timer.claim(ticket)
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_last_write_wins() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = SubmissionDebouncer::new(tx);
        let delay = Duration::from_millis(2500);

        debouncer.schedule("book a", delay);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let start = Instant::now();
        let ticket = debouncer.schedule("book a flight", delay);

        let event = rx.recv().await.unwrap();
        assert_eq!(start.elapsed(), delay);
        assert_eq!(
            event,
            ControllerEvent::DebounceElapsed {
                ticket,
                text: "book a flight".to_string()
            }
        );
        assert!(debouncer.claim(ticket));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_pending_cancels_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = SubmissionDebouncer::new(tx);

        let ticket = debouncer.schedule("turn on the lights", Duration::from_millis(2500));
        assert_eq!(debouncer.pending_text(), Some("turn on the lights"));
        assert_eq!(debouncer.take_pending().as_deref(), Some("turn on the lights"));
        assert!(!debouncer.is_pending());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
        assert!(!debouncer.claim(ticket));
    }
}
