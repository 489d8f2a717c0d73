//! Transport adapter (spec.md §4.5, component E).
//!
//! The downstream transport session (TCP/TLS) and upstream application
//! session are both external collaborators (spec.md §1 "Deliberately out
//! of scope"); this module defines the trait seams the state machine
//! drives them through, grounded in the callback list spec.md §4.5
//! enumerates directly, kept trait-object-safe the way
//! `hoot::client::holder::CallHolder` wraps transport-specific behavior
//! behind a narrow interface.

use crate::error::Error;
use crate::handoff::HandoffMessage;

/// Why a connection was torn down, reported to the application alongside
/// the closing/closed notification (SPEC_FULL.md §12 "Structured
/// close-reason reporting").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Clean,
    Protocol(Error),
    TransportReset,
    IdleTimeout,
    PeerConnectionClose,
}

/// Notifications delivered to the application session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Accepted,
    Connected,
    ConnectFailed(Error),
    Closing(CloseReason),
    Closed(CloseReason),
    Reset,
    Deleted,
}

/// Downstream byte-oriented transport session (spec.md §1, §4.5).
pub trait Transport {
    /// Copy newly-available bytes into `buf`, appending, and return how
    /// many were added. Peeked bytes are not considered consumed until
    /// [`Transport::consume_rx`] is called (spec.md §3 invariant 1).
    fn peek_rx(&mut self, buf: &mut Vec<u8>) -> usize;

    /// Drop the first `n` bytes the connection has finished with.
    fn consume_rx(&mut self, n: usize);

    /// Attempt to enqueue `data`; returns the number of bytes accepted.
    /// A short result while sending formatted control-data is fatal
    /// (spec.md §4.4, §9 Open Questions).
    fn try_send(&mut self, data: &[u8]) -> usize;

    fn tx_free_space(&self) -> usize;

    /// Request a wakeup once tx free space rises above the fifo threshold
    /// (spec.md §4.4 APP_IO_MORE_DATA backpressure).
    fn request_tx_drain_notification(&mut self);

    fn disconnect(&mut self);
}

/// Upstream message-oriented application session (spec.md §1, §4.5).
pub trait AppSession {
    /// Enqueue a handoff message and its payload atomically. Returns the
    /// number of payload bytes accepted; `0` means not even the header fit
    /// (caller registers a dequeue-notification and returns STOP).
    fn try_enqueue(&mut self, msg: HandoffMessage) -> usize;

    /// Enqueue a raw continuation chunk of an already-handed-off body
    /// (spec.md §4.4 CLIENT_IO_MORE_DATA byte pump). Returns bytes accepted.
    fn try_enqueue_bytes(&mut self, data: &[u8]) -> usize;

    fn try_dequeue(&mut self) -> Option<HandoffMessage>;

    /// Free space in the app rx queue, used to size the handoff reservation
    /// (spec.md §4.4: "Reserve app rx-queue space for at least
    /// `control_data_len` bytes plus the handoff message header").
    fn rx_free_space(&self) -> usize;

    fn request_rx_drain_notification(&mut self);

    fn notify(&mut self, event: AppEvent);
}
