use std::sync::{Arc, Condvar, Mutex, PoisonError};

use tracing::trace;

use crate::foundation::config::FeatureFlags;

#[derive(Debug, Default)]
struct Tickets {
    next: u64,
    serving: u64,
}

/// Process-wide gate serializing color-buffer commits ("gralloc sync").
///
/// Guest threads lock and unlock gralloc buffers in an order the host must
/// reproduce, but their render control requests arrive on independent host
/// workers. Holders are admitted strictly in ticket order, so commits land in
/// the order their lock phase began. A disabled gate hands out empty holds and
/// provides no ordering at all.
///
/// A hold is an owned value rather than a borrowed guard: the lock phase
/// (`ColorBufferCacheFlush`) and the unlock phase (`UpdateColorBuffer`) are
/// separate requests.
#[derive(Debug)]
pub struct OrderingGate {
    enabled: bool,
    tickets: Mutex<Tickets>,
    turn: Condvar,
}

impl OrderingGate {
    /// Gate that orders holders only when `enabled`.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            tickets: Mutex::new(Tickets::default()),
            turn: Condvar::new(),
        }
    }

    /// Gate enabled by [`FeatureFlags::gralloc_sync`].
    pub fn from_flags(flags: &FeatureFlags) -> Self {
        Self::new(flags.gralloc_sync)
    }

    /// Whether holders are ordered.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Block until every earlier ticket has been released, then hold the gate.
    pub fn acquire(self: &Arc<Self>) -> GateHold {
        if !self.enabled {
            return GateHold::empty();
        }

        let mut tickets = self.tickets.lock().unwrap_or_else(PoisonError::into_inner);
        let ticket = tickets.next;
        tickets.next += 1;
        if tickets.serving != ticket {
            trace!(ticket, serving = tickets.serving, "waiting for gralloc gate");
        }
        let _admitted = self
            .turn
            .wait_while(tickets, |t| t.serving != ticket)
            .unwrap_or_else(PoisonError::into_inner);
        trace!(ticket, "gralloc gate acquired");

        GateHold {
            gate: Some(Arc::clone(self)),
            ticket,
        }
    }

    /// Number of holds handed out so far (enabled gates only).
    pub fn tickets_issued(&self) -> u64 {
        self.tickets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next
    }

    fn release(&self, ticket: u64) {
        let mut tickets = self.tickets.lock().unwrap_or_else(PoisonError::into_inner);
        debug_assert_eq!(tickets.serving, ticket, "gate released out of turn");
        tickets.serving += 1;
        drop(tickets);
        self.turn.notify_all();
        trace!(ticket, "gralloc gate released");
    }
}

/// Ownership of the [`OrderingGate`]. Dropping it admits the next ticket.
#[derive(Debug)]
#[must_use = "dropping a GateHold releases the gate immediately"]
pub struct GateHold {
    gate: Option<Arc<OrderingGate>>,
    ticket: u64,
}

impl GateHold {
    fn empty() -> Self {
        Self {
            gate: None,
            ticket: 0,
        }
    }

    /// The admission ticket, or `None` for a hold on a disabled gate.
    pub fn ticket(&self) -> Option<u64> {
        self.gate.as_ref().map(|_| self.ticket)
    }

    /// Release the gate now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for GateHold {
    fn drop(&mut self) {
        if let Some(gate) = self.gate.take() {
            gate.release(self.ticket);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sync/gate.rs"]
mod tests;
