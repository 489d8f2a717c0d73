//! Seven-state dispatcher (spec.md §4.4, component D) — the core of the
//! crate. One [`HttpState`] per connection; [`dispatch`] re-enters the
//! handler for the current state while it reports `Continue`, stopping on
//! `Stop` (parked awaiting an external event) or `Error` (connection is
//! being torn down; caller must not re-dispatch).

use std::time::SystemTime;

use log::{debug, trace, warn};

use crate::conn::{Connection, ParsedOffsets, ProtocolPhase, Role};
use crate::error::{Error, ErrorStatus};
use crate::handoff::{HandoffMessage, Payload, ReplyMeta, RequestMeta};
use crate::parse::{
    parse_content_length, parse_headers_section, parse_request_line, parse_status_line, Method,
    TargetForm,
};
use crate::status;
use crate::transport::{AppEvent, AppSession, CloseReason, Transport};
use crate::txbuf::TxBuf;
use crate::util::{find_from, format_http_date, trim_ascii_whitespace};

/// IDLE is unreachable for established connections (spec.md §4.4); it
/// exists only as the pre-accept/pre-connect placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpState {
    Idle,
    WaitAppMethod,
    WaitClientMethod,
    WaitServerReply,
    WaitAppReply,
    ClientIoMoreData,
    AppIoMoreData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Continue,
    Stop,
    Error,
}

/// Per-tick byte allowance from the scheduler (spec.md §4.4 "Burst
/// budget"), consumed by APP_IO_MORE_DATA and refilled by the caller
/// between dispatch calls.
pub struct Budget {
    pub bytes: usize,
    /// `Config::fifo_threshold()` — the tx free-space floor below which
    /// APP_IO_MORE_DATA requests a drain notification and stands down
    /// (spec.md §4.4 "fifo threshold").
    pub fifo_threshold: usize,
}

const APP_IO_TICK_CAP: usize = 64 * 1024;
/// Rough upper bound on the fixed portion of a handoff message, used to
/// size the app rx-queue reservation check (spec.md §4.4: "Reserve app
/// rx-queue space for at least control_data_len bytes plus the handoff
/// message header"). The header itself is an internal implementation
/// detail of `AppSession`; this is a conservative estimate.
const HANDOFF_HEADER_SIZE: usize = 64;

/// Re-enter the handler for `conn.http_state` until it stops progressing.
pub(crate) fn dispatch<T: Transport, A: AppSession>(
    conn: &mut Connection,
    transport: &mut T,
    app: &mut A,
    budget: &mut Budget,
) -> Disposition {
    loop {
        let state = conn.http_state;
        let result = match state {
            HttpState::Idle => Disposition::Stop,
            HttpState::WaitClientMethod => handle_wait_client_method(conn, transport, app),
            HttpState::WaitServerReply => handle_wait_server_reply(conn, transport, app),
            HttpState::ClientIoMoreData => handle_client_io_more_data(conn, transport, app),
            HttpState::WaitAppMethod => handle_wait_app_method(conn, transport, app),
            HttpState::WaitAppReply => handle_wait_app_reply(conn, transport, app),
            HttpState::AppIoMoreData => handle_app_io_more_data(conn, transport, app, budget),
        };
        match result {
            Disposition::Continue => {
                trace!("{state:?} -> {:?} (continue)", conn.http_state);
                continue;
            }
            Disposition::Stop => {
                trace!("{state:?} parked");
                return Disposition::Stop;
            }
            Disposition::Error => return Disposition::Error,
        }
    }
}

fn advance_after_full_request<T: Transport, A: AppSession>(
    conn: &mut Connection,
    transport: &mut T,
    app: &mut A,
    accepted: usize,
    total: usize,
) -> Disposition {
    if accepted >= total {
        // No pipelining: whatever else is sitting in rx_buf is dropped.
        transport.consume_rx(conn.rx_buf.len());
        conn.rx_buf.clear();
        conn.to_recv = 0;
        match conn.role {
            Role::Server => {
                conn.http_state = HttpState::WaitAppReply;
                Disposition::Continue
            }
            Role::Client if conn.close_after_transaction => fail_client_rx_clean(conn, transport, app),
            Role::Client => {
                conn.http_state = HttpState::WaitAppMethod;
                Disposition::Continue
            }
        }
    } else {
        let body_handed_off = accepted.saturating_sub(conn.offsets.control_data_len);
        transport.consume_rx(accepted);
        conn.consume_rx_buf(accepted);
        conn.to_recv = conn.offsets.body_len - body_handed_off as u64;
        conn.http_state = HttpState::ClientIoMoreData;
        Disposition::Continue
    }
}

fn handle_wait_client_method<T: Transport, A: AppSession>(
    conn: &mut Connection,
    transport: &mut T,
    app: &mut A,
) -> Disposition {
    transport.peek_rx(&mut conn.rx_buf);
    if conn.rx_buf.len() < 8 {
        return Disposition::Stop;
    }

    let line = match parse_request_line(&conn.rx_buf) {
        Ok(l) => l,
        Err(e) => return fail_server_rx(conn, transport, app, e),
    };
    let headers = match parse_headers_section(&conn.rx_buf, line.line_end) {
        Ok(h) => h,
        Err(e) => return fail_server_rx(conn, transport, app, e),
    };
    let body_len = match parse_content_length(&conn.rx_buf, headers) {
        Ok(v) => v.unwrap_or(0),
        Err(e) => return fail_server_rx(conn, transport, app, e),
    };
    if headers_request_close(&conn.rx_buf[headers.offset..headers.offset + headers.len]) {
        conn.close_after_transaction = true;
    }

    conn.offsets = ParsedOffsets {
        control_data_len: headers.body_offset,
        headers_offset: headers.offset,
        headers_len: headers.len,
        body_offset: headers.body_offset,
        body_len,
        method: Some(line.method),
        target_form: Some(line.target_form),
        target_path_offset: line.target_path_offset,
        target_path_len: line.target_path_len,
        target_query_offset: line.target_query_offset,
        target_query_len: line.target_query_len,
        status_code: None,
    };

    let total = headers.body_offset + body_len as usize;
    if app.rx_free_space() < headers.body_offset + HANDOFF_HEADER_SIZE {
        return fail_server_rx(conn, transport, app, Error::AppRxQueueTooSmall);
    }

    let inline_len = total.min(conn.rx_buf.len());
    let meta = RequestMeta {
        method: line.method,
        target_form: line.target_form,
        target_path_offset: line.target_path_offset,
        target_path_len: line.target_path_len,
        target_query_offset: line.target_query_offset,
        target_query_len: line.target_query_len,
        headers_offset: headers.offset,
        headers_len: headers.len,
        body_offset: headers.body_offset,
        body_len: body_len as usize,
    };
    let payload = Payload::Inline(conn.rx_buf[..inline_len].to_vec());
    let accepted = app.try_enqueue(HandoffMessage::Request(meta, payload));
    if accepted < headers.body_offset {
        return fail_server_rx(conn, transport, app, Error::AppRxQueueTooSmall);
    }

    let path = String::from_utf8_lossy(
        &conn.rx_buf[line.target_path_offset..line.target_path_offset + line.target_path_len],
    );
    debug!("request handed off: {} {path}", method_label(line.method));
    advance_after_full_request(conn, transport, app, accepted, total)
}

fn method_label(method: Method) -> &'static str {
    match method {
        Method::Get => http::Method::GET.as_str(),
        Method::Post => http::Method::POST.as_str(),
    }
}

fn handle_wait_server_reply<T: Transport, A: AppSession>(
    conn: &mut Connection,
    transport: &mut T,
    app: &mut A,
) -> Disposition {
    transport.peek_rx(&mut conn.rx_buf);
    if conn.rx_buf.len() < 8 {
        return Disposition::Stop;
    }

    let line = match parse_status_line(&conn.rx_buf) {
        Ok(l) => l,
        Err(e) => return fail_client_rx(conn, transport, app, e),
    };
    let headers = match parse_headers_section(&conn.rx_buf, line.line_end) {
        Ok(h) => h,
        Err(e) => return fail_client_rx(conn, transport, app, e),
    };
    let body_len = match parse_content_length(&conn.rx_buf, headers) {
        Ok(v) => v.unwrap_or(0),
        Err(e) => return fail_client_rx(conn, transport, app, e),
    };
    if headers_request_close(&conn.rx_buf[headers.offset..headers.offset + headers.len]) {
        conn.close_after_transaction = true;
    }

    let code = status::bucket(line.status_code);

    conn.offsets = ParsedOffsets {
        control_data_len: headers.body_offset,
        headers_offset: headers.offset,
        headers_len: headers.len,
        body_offset: headers.body_offset,
        body_len,
        method: None,
        target_form: None,
        target_path_offset: 0,
        target_path_len: 0,
        target_query_offset: 0,
        target_query_len: 0,
        status_code: Some(code),
    };

    let total = headers.body_offset + body_len as usize;
    if app.rx_free_space() < headers.body_offset + HANDOFF_HEADER_SIZE {
        return fail_client_rx(conn, transport, app, Error::AppRxQueueTooSmall);
    }

    let inline_len = total.min(conn.rx_buf.len());
    let meta = ReplyMeta {
        code,
        headers_offset: headers.offset,
        headers_len: headers.len,
        body_offset: headers.body_offset,
        body_len: body_len as usize,
    };
    let payload = Payload::Inline(conn.rx_buf[..inline_len].to_vec());
    let accepted = app.try_enqueue(HandoffMessage::Reply(meta, payload));
    if accepted < headers.body_offset {
        return fail_client_rx(conn, transport, app, Error::AppRxQueueTooSmall);
    }

    debug!("reply handed off: status {code}");
    advance_after_full_request(conn, transport, app, accepted, total)
}

fn handle_client_io_more_data<T: Transport, A: AppSession>(
    conn: &mut Connection,
    transport: &mut T,
    app: &mut A,
) -> Disposition {
    transport.peek_rx(&mut conn.rx_buf);
    let avail = conn.rx_buf.len();

    if avail as u64 > conn.to_recv {
        return fail_protocol(conn, transport, app, Error::BadHeaders);
    }

    let n = avail.min(app.rx_free_space()).min(conn.to_recv as usize);
    if n == 0 {
        debug!("client io stalled, app rx queue full, {} bytes still expected", conn.to_recv);
        app.request_rx_drain_notification();
        return Disposition::Stop;
    }

    let accepted = app.try_enqueue_bytes(&conn.rx_buf[..n]);
    if accepted == 0 {
        app.request_rx_drain_notification();
        return Disposition::Stop;
    }

    transport.consume_rx(accepted);
    conn.consume_rx_buf(accepted);
    conn.to_recv -= accepted as u64;

    if conn.to_recv == 0 {
        match conn.role {
            Role::Server => conn.http_state = HttpState::WaitAppReply,
            Role::Client if conn.close_after_transaction => {
                return fail_client_rx_clean(conn, transport, app)
            }
            Role::Client => conn.http_state = HttpState::WaitAppMethod,
        }
    }
    Disposition::Continue
}

/// Line-anchored, case-insensitive scan for a `Connection: close` header
/// (SPEC_FULL.md §12 "`Connection: close` observation"), mirroring
/// `parse_content_length`'s `\r\n`-line-scanning match (src/parse/headers.rs)
/// rather than an unanchored substring search: a header name must match
/// exactly at the start of a line, and the value must match `close` exactly,
/// so `Keep-Connection: foo` and `Connection: closed-for-maintenance` are
/// both correctly left alone.
fn headers_request_close(header_bytes: &[u8]) -> bool {
    const NAME: &[u8] = b"connection:";
    const VALUE: &[u8] = b"close";

    let mut cursor = 0;
    while cursor < header_bytes.len() {
        let line_end =
            find_from(header_bytes, cursor, header_bytes.len() - cursor, b"\r\n")
                .unwrap_or(header_bytes.len());
        let line = &header_bytes[cursor..line_end];

        if line.len() >= NAME.len() && line[..NAME.len()].eq_ignore_ascii_case(NAME) {
            let value = trim_ascii_whitespace(&line[NAME.len()..]);
            if value.eq_ignore_ascii_case(VALUE) {
                return true;
            }
        }

        cursor = line_end + 2;
    }

    false
}

fn target_string(form: TargetForm, path: &[u8], query: &[u8]) -> String {
    let path = String::from_utf8_lossy(path);
    let query = String::from_utf8_lossy(query);
    match form {
        TargetForm::Asterisk => "*".to_string(),
        TargetForm::Origin if query.is_empty() => format!("/{path}"),
        TargetForm::Origin => format!("/{path}?{query}"),
        TargetForm::Absolute | TargetForm::Authority if query.is_empty() => path.into_owned(),
        TargetForm::Absolute | TargetForm::Authority => format!("{path}?{query}"),
    }
}

fn handle_wait_app_method<T: Transport, A: AppSession>(
    conn: &mut Connection,
    transport: &mut T,
    app: &mut A,
) -> Disposition {
    let msg = match app.try_dequeue() {
        Some(m) => m,
        None => return Disposition::Stop,
    };
    let (meta, payload) = match msg {
        HandoffMessage::Request(meta, payload) => (meta, payload),
        HandoffMessage::Reply(..) => {
            return fail_protocol(conn, transport, app, Error::UnexpectedMessageType)
        }
    };

    match (meta.method, meta.body_len) {
        (Method::Get, n) if n != 0 => {
            return fail_protocol(conn, transport, app, Error::MethodBodyMismatch)
        }
        (Method::Post, 0) => return fail_protocol(conn, transport, app, Error::MethodBodyMismatch),
        _ => {}
    }

    let bytes = payload.bytes();
    let target_path = &bytes[meta.target_path_offset..meta.target_path_offset + meta.target_path_len];
    let target_query =
        &bytes[meta.target_query_offset..meta.target_query_offset + meta.target_query_len];
    let target = target_string(meta.target_form, target_path, target_query);
    let method_str = method_label(meta.method);

    let mut control = format!(
        "{method_str} {target} HTTP/1.1\r\nHost: {}\r\nUser-Agent: {}\r\n",
        conn.identity.host.as_deref().unwrap_or(""),
        conn.identity.app_name,
    );
    if meta.body_len > 0 {
        control.push_str(&format!("Content-Length: {}\r\n", meta.body_len));
    }
    let header_bytes = &bytes[meta.headers_offset..meta.headers_offset + meta.headers_len];
    if headers_request_close(header_bytes) {
        conn.close_after_transaction = true;
    }

    let mut wire = control.into_bytes();
    wire.extend_from_slice(header_bytes);
    wire.extend_from_slice(b"\r\n");

    let sent = transport.try_send(&wire);
    if sent < wire.len() {
        return fail_protocol(conn, transport, app, Error::ShortTransportSend);
    }

    if meta.body_len > 0 {
        let body_in_payload = &bytes[meta.body_offset..meta.body_offset + meta.body_len as usize];
        conn.tx_buf = Some(TxBuf::inline(body_in_payload.to_vec()));
        conn.http_state = HttpState::AppIoMoreData;
        Disposition::Continue
    } else {
        conn.http_state = HttpState::WaitServerReply;
        Disposition::Stop
    }
}

fn handle_wait_app_reply<T: Transport, A: AppSession>(
    conn: &mut Connection,
    transport: &mut T,
    app: &mut A,
) -> Disposition {
    let msg = match app.try_dequeue() {
        Some(m) => m,
        None => return Disposition::Stop,
    };
    let (meta, payload) = match msg {
        HandoffMessage::Reply(meta, payload) => (meta, payload),
        HandoffMessage::Request(..) => {
            return fail_protocol(conn, transport, app, Error::UnexpectedMessageType)
        }
    };
    if !status::is_valid(meta.code) {
        return fail_protocol(conn, transport, app, Error::InvalidStatusCode);
    }

    let reason = reason_phrase(meta.code);
    let date = format_http_date(SystemTime::now());
    let mut control = format!(
        "HTTP/1.1 {} {reason}\r\nDate: {date}\r\nServer: {}\r\nContent-Length: {}\r\n",
        meta.code, conn.identity.app_name, meta.body_len,
    );
    let header_bytes =
        &payload.bytes()[meta.headers_offset..meta.headers_offset + meta.headers_len];
    if headers_request_close(header_bytes) {
        conn.close_after_transaction = true;
    }

    let mut wire = control.into_bytes();
    wire.extend_from_slice(header_bytes);
    wire.extend_from_slice(b"\r\n");

    let sent = transport.try_send(&wire);
    if sent < wire.len() {
        return fail_protocol(conn, transport, app, Error::ShortTransportSend);
    }

    if meta.body_len > 0 {
        let bytes = payload.bytes();
        let body = &bytes[meta.body_offset..meta.body_offset + meta.body_len as usize];
        conn.tx_buf = Some(TxBuf::inline(body.to_vec()));
        conn.http_state = HttpState::AppIoMoreData;
        Disposition::Continue
    } else if conn.close_after_transaction {
        fail_server_rx_clean(conn, transport, app)
    } else {
        conn.reset_for_next_request();
        Disposition::Stop
    }
}

fn handle_app_io_more_data<T: Transport, A: AppSession>(
    conn: &mut Connection,
    transport: &mut T,
    app: &mut A,
    budget: &mut Budget,
) -> Disposition {
    let Some(tx_buf) = conn.tx_buf.as_mut() else {
        return fail_protocol(conn, transport, app, Error::ShortTransportSend);
    };

    let cap = APP_IO_TICK_CAP.min(budget.bytes).min(transport.tx_free_space());
    let seg = tx_buf.get_segs(cap);
    if seg.is_empty() && !tx_buf.is_drained() {
        debug!("app io stalled, transport tx queue full, {} bytes remaining", tx_buf.remaining());
        transport.request_tx_drain_notification();
        return Disposition::Stop;
    }

    let sent = transport.try_send(seg);
    tx_buf.drain(sent);
    budget.bytes = budget.bytes.saturating_sub(sent);

    if !tx_buf.is_drained() {
        if transport.tx_free_space() < budget.fifo_threshold {
            trace!("tx free space below fifo threshold, arming drain notification");
            transport.request_tx_drain_notification();
        }
        return Disposition::Stop;
    }

    conn.tx_buf = None;
    conn.http_state = match conn.role {
        Role::Server => HttpState::WaitClientMethod,
        Role::Client => HttpState::WaitServerReply,
    };
    // Role::Client lands in WaitServerReply here, not a re-arm state: a
    // close the client itself requested (set while formatting this very
    // request in handle_wait_app_method) still has the reply to receive
    // before the transaction is over, so only the server's own finished
    // reply closes the connection at this point.
    if conn.role == Role::Server && conn.close_after_transaction {
        return fail_server_rx_clean(conn, transport, app);
    }
    if conn.role == Role::Server {
        conn.reset_for_next_request();
    }
    Disposition::Stop
}

/// Canonical reason phrase for a bucketed status code. Deferred to `http`'s
/// registry (spec.md leaves the reason phrase unspecified beyond "a
/// reason phrase") rather than maintaining a second lookup table of our
/// own alongside `status::KNOWN_CODES`.
fn reason_phrase(code: u16) -> &'static str {
    http::StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

/// Minimal error response + teardown for a server-side rx parse/resource
/// failure (spec.md §4.4 "Failure semantics", §7.1–7.3).
fn fail_server_rx<T: Transport, A: AppSession>(
    conn: &mut Connection,
    transport: &mut T,
    app: &mut A,
    err: Error,
) -> Disposition {
    warn!("server rx failure: {err}");
    conn.phase = ProtocolPhase::Closed;
    if let Some(status) = err.status_code() {
        send_minimal_error(transport, status);
    }
    app.notify(AppEvent::Closing(CloseReason::Protocol(err)));
    app.notify(AppEvent::Closed(CloseReason::Protocol(err)));
    transport.disconnect();
    Disposition::Error
}

/// A clean, app-driven close after a transaction where the peer asked not
/// to reuse the connection (SPEC_FULL.md §12).
fn fail_server_rx_clean<T: Transport, A: AppSession>(
    conn: &mut Connection,
    transport: &mut T,
    app: &mut A,
) -> Disposition {
    debug!("closing connection cleanly after transaction, peer requested no reuse");
    conn.phase = ProtocolPhase::Closed;
    app.notify(AppEvent::Closing(CloseReason::Clean));
    app.notify(AppEvent::Closed(CloseReason::Clean));
    transport.disconnect();
    Disposition::Error
}

/// Client-side rx parse failure: no response is possible (spec.md §4.4:
/// "Parse failure on the client rx path: no response possible; notify app
/// closing and closed, disconnect downstream.").
fn fail_client_rx<T: Transport, A: AppSession>(
    conn: &mut Connection,
    transport: &mut T,
    app: &mut A,
    err: Error,
) -> Disposition {
    warn!("client rx failure: {err}");
    conn.phase = ProtocolPhase::Closed;
    app.notify(AppEvent::Closing(CloseReason::Protocol(err)));
    app.notify(AppEvent::Closed(CloseReason::Protocol(err)));
    transport.disconnect();
    Disposition::Error
}

/// A clean, peer-driven close after a transaction where the server asked
/// not to reuse the connection (SPEC_FULL.md §12), mirroring
/// `fail_server_rx_clean`'s server-side counterpart.
fn fail_client_rx_clean<T: Transport, A: AppSession>(
    conn: &mut Connection,
    transport: &mut T,
    app: &mut A,
) -> Disposition {
    debug!("closing connection cleanly after transaction, peer requested no reuse");
    conn.phase = ProtocolPhase::Closed;
    app.notify(AppEvent::Closing(CloseReason::PeerConnectionClose));
    app.notify(AppEvent::Closed(CloseReason::PeerConnectionClose));
    transport.disconnect();
    Disposition::Error
}

/// App-side protocol violation: drop all app tx bytes, notify, disconnect
/// (spec.md §4.4, §7.4). Also used for resource/internal failures on the
/// tx path that have no wire representation to send.
fn fail_protocol<T: Transport, A: AppSession>(
    conn: &mut Connection,
    transport: &mut T,
    app: &mut A,
    err: Error,
) -> Disposition {
    warn!("protocol violation: {err}");
    conn.phase = ProtocolPhase::Closed;
    app.notify(AppEvent::Closing(CloseReason::Protocol(err)));
    app.notify(AppEvent::Closed(CloseReason::Protocol(err)));
    transport.disconnect();
    Disposition::Error
}

fn send_minimal_error<T: Transport>(transport: &mut T, status: ErrorStatus) {
    let date = format_http_date(SystemTime::now());
    let resp = format!(
        "HTTP/1.1 {} {}\r\nDate: {date}\r\nConnection: close\r\nContent-Length: 0\r\n\r\n",
        status.code(),
        status.reason(),
    );
    transport.try_send(resp.as_bytes());
}
