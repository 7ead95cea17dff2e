//! Silence watchdog
//!
//! A restartable timer that forces capture to stop when no new transcript
//! arrives within a bound. Expiry is delivered as
//! [`ControllerEvent::SilenceElapsed`] on the controller queue.

use std::time::Duration;

use super::events::{ControllerEvent, EventSender, TimerTicket};
use super::timer::TicketedTimer;

/// Restartable silence timer
///
/// At most one timer is outstanding; arming always cancels the previous one.
pub struct SilenceWatchdog {
    timer: TicketedTimer<()>,
}

impl SilenceWatchdog {
    /// Create a watchdog posting expiries to `events`
    #[must_use]
    pub const fn new(events: EventSender) -> Self {
        Self {
            timer: TicketedTimer::new(events),
        }
    }

    /// Schedule expiry after `timeout`, replacing any pending schedule
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(&mut self, timeout: Duration) -> TimerTicket {
        let ticket = self
            .timer
            .schedule((), timeout, ControllerEvent::SilenceElapsed);
        tracing::trace!(?ticket, timeout_ms = timeout.as_millis(), "silence watchdog armed");
        ticket
    }

    /// Cancel the pending expiry, if any
    pub fn disarm(&mut self) {
        if let Some((ticket, ())) = self.timer.cancel() {
            tracing::trace!(?ticket, "silence watchdog disarmed");
        }
    }

    /// Ticket of the pending schedule
    #[must_use]
    pub fn current(&self) -> Option<TimerTicket> {
        self.timer.current()
    }

    /// Whether a schedule is pending
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.timer.current().is_some()
    }

    /// Accept an expiry
    ///
    /// Returns true only if `ticket` is the pending schedule, which is then
    /// cleared. An expiry that raced with a re-arm or disarm is rejected.
    pub fn claim(&mut self, ticket: TimerTicket) -> bool {
        self.timer.claim(ticket)
    }
}
