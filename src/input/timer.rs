//! One-shot timer posting its expiry to the controller queue
//!
//! Each schedule gets a fresh [`TimerTicket`]. Rescheduling or cancelling
//! aborts the sleeping task, and [`TicketedTimer::claim`] rejects expiries
//! that were already in the queue when that happened.

use std::time::Duration;

use tokio::task::JoinHandle;

use super::events::{ControllerEvent, EventSender, TimerTicket};

struct Pending<T> {
    ticket: TimerTicket,
    value: T,
    handle: JoinHandle<()>,
}

/// At most one outstanding schedule carrying a value of type `T`
pub(crate) struct TicketedTimer<T> {
    events: EventSender,
    next_ticket: u64,
    pending: Option<Pending<T>>,
}

impl<T> TicketedTimer<T> {
    pub(crate) const fn new(events: EventSender) -> Self {
        Self {
            events,
            next_ticket: 0,
            pending: None,
        }
    }

    /// Post `expiry(ticket)` after `after`, replacing any pending schedule
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn schedule<F>(&mut self, value: T, after: Duration, expiry: F) -> TimerTicket
    where
        F: FnOnce(TimerTicket) -> ControllerEvent + Send + 'static,
    {
        self.cancel();

        self.next_ticket += 1;
        let ticket = TimerTicket(self.next_ticket);
        let events = self.events.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = events.send(expiry(ticket));
        });

        self.pending = Some(Pending {
            ticket,
            value,
            handle,
        });
        ticket
    }

    /// Abort the pending schedule and hand back its value
    pub(crate) fn cancel(&mut self) -> Option<(TimerTicket, T)> {
        self.pending.take().map(|pending| {
            pending.handle.abort();
            (pending.ticket, pending.value)
        })
    }

    pub(crate) fn current(&self) -> Option<TimerTicket> {
        self.pending.as_ref().map(|p| p.ticket)
    }

    pub(crate) fn value(&self) -> Option<&T> {
        self.pending.as_ref().map(|p| &p.value)
    }

    /// Accept an expiry
    ///
    /// Returns true only if `ticket` is the pending schedule, which is then
    /// cleared.
    pub(crate) fn claim(&mut self, ticket: TimerTicket) -> bool {
        if self.current() == Some(ticket) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

impl<T> Drop for TicketedTimer<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}
