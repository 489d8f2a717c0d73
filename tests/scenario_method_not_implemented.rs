//! End-to-end scenario 6: an asterisk-form target on an unimplemented
//! method (OPTIONS) is rejected with 501 before target classification even
//! runs (spec.md §8 scenario 6).

mod support;

use h1bridge::{Budget, Config, Disposition, Endpoint, Identity};
use support::{MockApp, MockTransport};

#[test]
fn options_asterisk_is_not_implemented() {
    let config = Config::default();
    let mut server = Endpoint::accept(Identity::new("test-server/1.0", None), &config);
    let mut transport = MockTransport::new();
    let mut app = MockApp::new();
    let mut budget = Budget {
        bytes: usize::MAX,
        fifo_threshold: config.fifo_threshold(),
    };

    transport.deliver(b"OPTIONS * HTTP/1.1\r\n\r\n");

    assert_eq!(server.dispatch(&mut transport, &mut app, &mut budget), Disposition::Error);

    let sent = String::from_utf8(transport.sent).unwrap();
    assert!(sent.starts_with("HTTP/1.1 501 Not Implemented\r\n"), "{sent}");
    assert!(transport.disconnected);
}
