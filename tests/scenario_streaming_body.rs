//! End-to-end scenario 3: a body larger than the app's rx queue streams in
//! via CLIENT_IO_MORE_DATA, with backpressure re-arming the drain
//! notification and `to_recv` strictly decreasing (spec.md §8 scenario 3).

mod support;

use h1bridge::{Budget, Config, Disposition, Endpoint, HttpState, Identity};
use support::{MockApp, MockTransport};

const BODY_LEN: usize = 2 * 1024 * 1024;
const QUEUE_SIZE: usize = 64 * 1024;

#[test]
fn large_body_streams_through_a_small_app_queue() {
    let config = Config::default();
    let mut server = Endpoint::accept(Identity::new("test-server/1.0", None), &config);
    let mut transport = MockTransport::new();
    let mut app = MockApp::new();
    app.rx_capacity = QUEUE_SIZE;
    let mut budget = Budget {
        bytes: usize::MAX,
        fifo_threshold: config.fifo_threshold(),
    };

    let body = vec![b'x'; BODY_LEN];
    let mut request = format!("POST /upload HTTP/1.1\r\nHost: x\r\nContent-Length: {BODY_LEN}\r\n\r\n").into_bytes();
    request.extend_from_slice(&body);
    transport.deliver(&request);

    assert_eq!(server.dispatch(&mut transport, &mut app, &mut budget), Disposition::Stop);
    assert_eq!(server.http_state(), HttpState::ClientIoMoreData);
    assert!(app.drain_requested, "app queue filled up, a drain notification must be armed");
    assert!(!app.body.is_empty() && app.body.len() <= QUEUE_SIZE);

    let mut guard = 0;
    while server.http_state() != HttpState::WaitAppReply {
        app.drain_requested = false;
        let before = app.body.len();
        // Simulate the app draining its queue and making room for more.
        app.rx_capacity += QUEUE_SIZE;
        assert_eq!(server.dispatch(&mut transport, &mut app, &mut budget), Disposition::Stop);
        assert!(app.body.len() > before, "each drained round must make forward progress");

        guard += 1;
        assert!(guard < 64, "streaming body did not converge");
    }

    assert_eq!(app.body.len(), BODY_LEN);
    assert_eq!(app.body, body);
}
