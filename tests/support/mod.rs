//! In-memory `Transport`/`AppSession` doubles for end-to-end scenario tests.
//!
//! Each test wires up two [`Endpoint`]s (one server-role, one client-role)
//! with their own [`MockTransport`]/[`MockApp`] pair and manually pipes
//! bytes between the two transports via [`pipe`], mirroring the way a real
//! deployment has a client process and a server process talking over a
//! socket neither endpoint owns.

use std::collections::VecDeque;

use h1bridge::{AppEvent, AppSession, HandoffMessage, Transport};

/// Byte-oriented transport double. `incoming` models bytes that have
/// arrived on the wire but not yet been consumed; `peeked` tracks how many
/// of those have already been copied out by a prior `peek_rx` call, so a
/// second peek before a consume only yields genuinely new bytes. `sent`
/// accumulates everything handed to [`Transport::try_send`] for the test to
/// inspect or pipe to the peer.
#[derive(Default)]
pub struct MockTransport {
    incoming: VecDeque<u8>,
    peeked: usize,
    pub sent: Vec<u8>,
    pub tx_window: usize,
    pub drain_requested: bool,
    pub disconnected: bool,
    pub consumed_total: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            tx_window: usize::MAX,
            ..Default::default()
        }
    }

    /// Simulate bytes arriving on the wire.
    pub fn deliver(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes.iter().copied());
    }

    /// Drain everything sent so far, for piping to a peer's `deliver`.
    pub fn take_sent(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.sent)
    }
}

impl Transport for MockTransport {
    fn peek_rx(&mut self, buf: &mut Vec<u8>) -> usize {
        let new: Vec<u8> = self.incoming.iter().skip(self.peeked).copied().collect();
        let n = new.len();
        buf.extend(new);
        self.peeked += n;
        n
    }

    fn consume_rx(&mut self, n: usize) {
        self.consumed_total += n;
        for _ in 0..n {
            self.incoming.pop_front();
        }
        self.peeked = self.peeked.saturating_sub(n);
    }

    fn try_send(&mut self, data: &[u8]) -> usize {
        let room = self.tx_window.saturating_sub(self.sent.len());
        let n = data.len().min(room);
        self.sent.extend_from_slice(&data[..n]);
        n
    }

    fn tx_free_space(&self) -> usize {
        self.tx_window.saturating_sub(self.sent.len())
    }

    fn request_tx_drain_notification(&mut self) {
        self.drain_requested = true;
    }

    fn disconnect(&mut self) {
        self.disconnected = true;
    }
}

/// Pipe everything a transport has sent so far into a peer transport's
/// incoming queue.
pub fn pipe(from: &mut MockTransport, to: &mut MockTransport) {
    let bytes = from.take_sent();
    to.deliver(&bytes);
}

/// App-session double. `outbox` holds handoff messages the test wants the
/// endpoint to transmit (drained via [`AppSession::try_dequeue`]); `inbox`
/// and `body` accumulate what the endpoint delivered from the wire.
#[derive(Default)]
pub struct MockApp {
    pub outbox: VecDeque<HandoffMessage>,
    pub inbox: Vec<HandoffMessage>,
    pub body: Vec<u8>,
    pub rx_capacity: usize,
    pub drain_requested: bool,
    pub events: Vec<AppEvent>,
}

impl MockApp {
    pub fn new() -> Self {
        MockApp {
            rx_capacity: usize::MAX,
            ..Default::default()
        }
    }
}

impl AppSession for MockApp {
    fn try_enqueue(&mut self, msg: HandoffMessage) -> usize {
        let total = msg.payload().len();
        let accepted = total.min(self.rx_capacity);
        self.rx_capacity -= accepted;

        // Record whatever body bytes fell within the accepted prefix, the
        // same way a real application would copy out only what it took.
        let body_offset = match &msg {
            HandoffMessage::Request(meta, _) => meta.body_offset,
            HandoffMessage::Reply(meta, _) => meta.body_offset,
        };
        if accepted > body_offset {
            self.body
                .extend_from_slice(&msg.payload().bytes()[body_offset..accepted]);
        }

        self.inbox.push(msg);
        accepted
    }

    fn try_enqueue_bytes(&mut self, data: &[u8]) -> usize {
        let accepted = data.len().min(self.rx_capacity);
        self.rx_capacity -= accepted;
        self.body.extend_from_slice(&data[..accepted]);
        accepted
    }

    fn try_dequeue(&mut self) -> Option<HandoffMessage> {
        self.outbox.pop_front()
    }

    fn rx_free_space(&self) -> usize {
        self.rx_capacity
    }

    fn request_rx_drain_notification(&mut self) {
        self.drain_requested = true;
    }

    fn notify(&mut self, event: AppEvent) {
        self.events.push(event);
    }
}
