//! Sans-IO HTTP/1.1 transport core.
//!
//! This crate implements the per-connection state machine that bridges a
//! byte-oriented transport session (TCP or TLS) with a message-oriented
//! application session: parsing request/response framing, synthesizing
//! boilerplate headers on egress, and enforcing backpressure when a queue
//! fills. It owns no sockets and spawns no threads — callers drive it by
//! peeking/enqueueing bytes through the [`transport::Transport`] and
//! [`transport::AppSession`] traits and calling [`Endpoint::dispatch`].
//!
//! # In scope
//!
//! * HTTP/1.x request-line, status-line, headers, and Content-Length body
//!   framing for GET and POST.
//! * The seven-state per-connection dispatcher, including the streaming
//!   sub-states used when a body doesn't fit in one pass.
//! * Per-connection idle timeout, with `(worker, slot)` addressed pools so
//!   connections survive callback re-entrancy and timer races.
//!
//! # Out of scope
//!
//! * Opening/closing sockets, TLS.
//! * Chunked transfer-encoding, pipelining, persistent-connection reuse
//!   across requests, trailers, upgrades, HTTP/2+.
//! * Listener registration, timer wheel internals, telemetry formatting.

#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::uninlined_format_args)]

pub use http;

mod config;
mod conn;
mod error;
mod fsm;
mod handoff;
mod parse;
mod pool;
mod status;
mod timer;
mod transport;
mod txbuf;
mod util;

pub use config::Config;
pub use conn::{Identity, ProtocolPhase, Role};
pub use error::{Error, ErrorStatus, Result};
pub use fsm::{Budget, Disposition, HttpState};
pub use handoff::{HandoffMessage, Payload, ReplyMeta, RequestMeta};
pub use parse::{Method, TargetForm};
pub use pool::{Pool, SlotId};
pub use transport::{AppEvent, AppSession, CloseReason, Transport};

use std::time::Instant;

use log::debug;

use conn::Connection;
use timer::IdleTimer;

/// A connection owned by one worker, addressed by [`SlotId`] when held in a
/// [`Pool`] (spec.md §9 "Per-worker pools with index handles").
pub struct Endpoint {
    conn: Connection,
}

impl Endpoint {
    /// Server-side: create a fresh connection after a transport accept,
    /// copying the listener's identity template (spec.md §3 "Lifecycle:
    /// Server", §4.5 "accept(ts)").
    pub fn accept(identity: Identity, config: &Config) -> Self {
        let mut conn =
            Connection::from_listener_template(&identity, IdleTimer::new(config.idle_timeout()));
        conn.start_timer(Instant::now());
        Endpoint { conn }
    }

    /// Client-side: promote a half-open record into a real connection once
    /// the transport confirms establishment (spec.md §3 "Lifecycle:
    /// Client", §4.5 "connected(...)").
    pub fn connected(identity: Identity, config: &Config) -> Self {
        let mut conn = Connection::from_half_open(identity, IdleTimer::new(config.idle_timeout()));
        conn.start_timer(Instant::now());
        Endpoint { conn }
    }

    pub fn role(&self) -> Role {
        self.conn.role
    }

    pub fn phase(&self) -> ProtocolPhase {
        self.conn.phase
    }

    pub fn http_state(&self) -> HttpState {
        self.conn.http_state
    }

    /// Run the state machine until it parks (spec.md §4.4 dispatcher:
    /// "re-enters while the handler returns CONTINUE"). Refreshes the idle
    /// timer on any successful (non-`Error`) pass (spec.md §4.6).
    pub fn dispatch<T: Transport, A: AppSession>(
        &mut self,
        transport: &mut T,
        app: &mut A,
        budget: &mut Budget,
    ) -> Disposition {
        let result = fsm::dispatch(&mut self.conn, transport, app, budget);
        if result != Disposition::Error {
            self.conn.refresh_timer(Instant::now());
        }
        result
    }

    /// Timer-wheel callback side of the idle-timer dance (spec.md §4.6,
    /// §9). Call on every tick; when it returns `true`, [`Endpoint::expire`]
    /// must be called exactly once to perform the deferred teardown.
    pub fn poll_idle_timer(&mut self, now: Instant) -> bool {
        self.conn.idle_timer.poll_expiry(now)
    }

    /// Deferred worker-thread side of the idle-timer dance: notify the app
    /// and disconnect the transport (spec.md §4.6, §7 "Timer expiry:
    /// close.").
    pub fn expire<T: Transport, A: AppSession>(&mut self, transport: &mut T, app: &mut A) {
        if !self.conn.idle_timer.acknowledge_expiry() {
            return;
        }
        debug!("connection idle timeout, tearing down");
        app.notify(AppEvent::Closing(CloseReason::IdleTimeout));
        app.notify(AppEvent::Closed(CloseReason::IdleTimeout));
        transport.disconnect();
        self.conn.phase = ProtocolPhase::Closed;
    }

    /// Transport reset (spec.md §4.4 "Failure semantics: Transport reset",
    /// §4.5 "reset(ts)"): free `tx_buf`, notify app, disconnect.
    pub fn reset<T: Transport, A: AppSession>(&mut self, transport: &mut T, app: &mut A) {
        debug!("transport reset, tearing down connection");
        self.conn.free_buffers();
        app.notify(AppEvent::Reset);
        app.notify(AppEvent::Closed(CloseReason::TransportReset));
        transport.disconnect();
        self.conn.phase = ProtocolPhase::Closed;
    }

    /// SESSION cleanup (spec.md §4.5 "cleanup(ts, SESSION)"): free
    /// buffers and stop the timer unless an expiry is already pending.
    pub fn cleanup<A: AppSession>(&mut self, app: &mut A) {
        self.conn.free_buffers();
        if !self.conn.idle_timer.is_pending() {
            self.conn.idle_timer.stop();
        }
        app.notify(AppEvent::Deleted);
    }
}
