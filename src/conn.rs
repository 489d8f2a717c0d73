//! Connection record (spec.md §3, §4.3, component C).

use std::time::Instant;

use crate::fsm::HttpState;
use crate::parse::{Method, TargetForm};
use crate::timer::IdleTimer;
use crate::txbuf::TxBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

/// Coarse protocol phase (spec.md §3), orthogonal to the fine-grained
/// [`HttpState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolPhase {
    Listen,
    Connecting,
    Established,
    TransportClosed,
    AppClosed,
    Closed,
}

/// Parsed-message offsets, absolute into `rx_buf` (spec.md §3). Reset at
/// the start of each request/response parse.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ParsedOffsets {
    pub control_data_len: usize,
    pub headers_offset: usize,
    pub headers_len: usize,
    pub body_offset: usize,
    pub body_len: u64,

    // request-only
    pub method: Option<Method>,
    pub target_form: Option<TargetForm>,
    pub target_path_offset: usize,
    pub target_path_len: usize,
    pub target_query_offset: usize,
    pub target_query_len: usize,

    // response-only
    pub status_code: Option<u16>,
}

/// Identity strings (spec.md §3): cloned rather than borrowed from the
/// listener/half-open template (spec.md §9 "Listener/half-open template
/// copying"), so the connection outlives its template.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    /// Server header value (server role) or User-Agent value (client role).
    pub(crate) app_name: String,
    /// `addr:port`, client role only.
    pub(crate) host: Option<String>,
}

impl Identity {
    pub fn new(app_name: impl Into<String>, host: Option<String>) -> Self {
        Identity {
            app_name: app_name.into(),
            host,
        }
    }
}

/// One per accepted/established connection (spec.md §3 "Connection
/// record").
pub(crate) struct Connection {
    pub role: Role,
    pub phase: ProtocolPhase,
    pub http_state: HttpState,

    pub rx_buf: Vec<u8>,
    pub offsets: ParsedOffsets,

    /// Remaining body bytes still expected after the initial handoff
    /// (streaming sub-state, spec.md §3 "to_recv").
    pub to_recv: u64,

    /// Only populated in APP_IO_MORE_DATA (spec.md §3).
    pub tx_buf: Option<TxBuf>,

    pub identity: Identity,

    pub idle_timer: IdleTimer,

    /// Whether either peer asked not to reuse this connection for a second
    /// transaction (SPEC_FULL.md §12 "`Connection: close` observation").
    pub close_after_transaction: bool,
}

impl Connection {
    pub fn new(role: Role, http_state: HttpState, idle_timer: IdleTimer, identity: Identity) -> Self {
        Connection {
            role,
            phase: ProtocolPhase::Established,
            http_state,
            rx_buf: Vec::new(),
            offsets: ParsedOffsets::default(),
            to_recv: 0,
            tx_buf: None,
            identity,
            idle_timer,
            close_after_transaction: false,
        }
    }

    /// Created on accept by copying a listener template (spec.md §3
    /// "Lifecycle: Server").
    pub fn from_listener_template(template: &Identity, idle_timer: IdleTimer) -> Self {
        Connection::new(Role::Server, HttpState::WaitClientMethod, idle_timer, template.clone())
    }

    /// Created by copying a half-open record into a real per-worker record
    /// once the transport confirms connection (spec.md §3 "Lifecycle:
    /// Client").
    pub fn from_half_open(identity: Identity, idle_timer: IdleTimer) -> Self {
        Connection::new(Role::Client, HttpState::WaitAppMethod, idle_timer, identity)
    }

    pub fn start_timer(&mut self, now: Instant) {
        self.idle_timer.start(now);
    }

    pub fn refresh_timer(&mut self, now: Instant) {
        self.idle_timer.refresh(now);
    }

    /// No-pipelining reset: drop all consumed and any trailing bytes,
    /// discard parsed offsets, and return to the role's method-wait state
    /// (spec.md §3 invariant 4, §4.4 WAIT_CLIENT_METHOD handler: "If the
    /// entire body was handed off, drop all remaining rx bytes").
    pub fn reset_for_next_request(&mut self) {
        self.rx_buf.clear();
        self.offsets = ParsedOffsets::default();
        self.to_recv = 0;
        self.tx_buf = None;
        self.http_state = match self.role {
            Role::Server => HttpState::WaitClientMethod,
            Role::Client => HttpState::WaitAppMethod,
        };
    }

    /// Drop the first `n` bytes of `rx_buf`, shifting the remainder down.
    pub fn consume_rx_buf(&mut self, n: usize) {
        self.rx_buf.drain(0..n);
    }

    /// Freed on SESSION cleanup (spec.md §4.5 "cleanup(ts, SESSION)").
    pub fn free_buffers(&mut self) {
        self.rx_buf = Vec::new();
        self.tx_buf = None;
    }
}
