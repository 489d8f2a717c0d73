//! Idle timer (spec.md §4.6, component F).
//!
//! Timer-wheel internals are out of scope (spec.md §1); this models only
//! the per-connection handle and the two-step expiry dance spec.md §9
//! calls for, driven by an externally-supplied `Instant` rather than
//! spawning a thread of its own — consistent with the core's sans-IO
//! posture (it owns no clock, no sockets, nothing that blocks).

use std::time::{Duration, Instant};

use log::trace;

/// One per connection. `start`/`refresh` are called on every successful
/// state-machine pass (spec.md §4.6: "updated... on every successful
/// state-machine pass").
#[derive(Debug)]
pub(crate) struct IdleTimer {
    timeout: Duration,
    deadline: Option<Instant>,
    /// Set by [`IdleTimer::poll_expiry`] (the timer-wheel callback side);
    /// cleared by [`IdleTimer::acknowledge_expiry`] (the deferred
    /// worker-thread side). Disambiguates "fired, awaiting teardown" from
    /// "active" and from "already invalidated on teardown" (spec.md §9).
    pending: bool,
}

impl IdleTimer {
    pub fn new(timeout: Duration) -> Self {
        IdleTimer {
            timeout,
            deadline: None,
            pending: false,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.deadline = Some(now + self.timeout);
        self.pending = false;
    }

    /// Reset to full timeout. No-op once expiry is pending — the handle is
    /// already invalidated on that side of the dance.
    pub fn refresh(&mut self, now: Instant) {
        if !self.pending {
            self.deadline = Some(now + self.timeout);
        }
    }

    pub fn stop(&mut self) {
        self.deadline = None;
        self.pending = false;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Timer-wheel callback side: if `now` has passed the deadline, set
    /// `pending` and invalidate the handle (clear the deadline) so a
    /// concurrent cleanup knows not to try to cancel it. Returns whether
    /// expiry just fired (idempotent: a caller that keeps polling after
    /// expiry gets `false` on subsequent calls until acknowledged).
    pub fn poll_expiry(&mut self, now: Instant) -> bool {
        if self.pending {
            return false;
        }
        match self.deadline {
            Some(d) if now >= d => {
                trace!("idle timer expired");
                self.pending = true;
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Deferred worker-thread callback side: consume the pending flag,
    /// reporting whether there was one to consume. The caller performs the
    /// actual teardown (notify app closing, disconnect) exactly once, only
    /// when this returns `true`.
    pub fn acknowledge_expiry(&mut self) -> bool {
        core::mem::take(&mut self.pending)
    }
}
