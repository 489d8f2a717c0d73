//! End-to-end scenario 1: a client-originated GET is handed off, parsed by
//! the server, replied to with 200, and the reply is parsed back by the
//! client (spec.md §8 scenario 1).

mod support;

use h1bridge::{
    Budget, Config, HandoffMessage, HttpState, Identity, Method, Payload, ReplyMeta, RequestMeta,
    TargetForm,
};
use support::{pipe, MockApp, MockTransport};

#[test]
fn get_request_round_trips_to_200_reply() {
    let config = Config::default();
    let mut client = h1bridge::Endpoint::connected(Identity::new("test-client/1.0", Some("example.test".into())), &config);
    let mut server = h1bridge::Endpoint::accept(Identity::new("test-server/1.0", None), &config);

    let mut client_transport = MockTransport::new();
    let mut server_transport = MockTransport::new();
    let mut client_app = MockApp::new();
    let mut server_app = MockApp::new();

    let mut budget = Budget {
        bytes: usize::MAX,
        fifo_threshold: config.fifo_threshold(),
    };

    // The app enqueues a GET for "/hello" with no extra headers or body.
    let path = b"hello";
    client_app.outbox.push_back(HandoffMessage::Request(
        RequestMeta {
            method: Method::Get,
            target_form: TargetForm::Origin,
            target_path_offset: 0,
            target_path_len: path.len(),
            target_query_offset: 0,
            target_query_len: 0,
            headers_offset: path.len(),
            headers_len: 0,
            body_offset: path.len(),
            body_len: 0,
        },
        Payload::Inline(path.to_vec()),
    ));

    assert_eq!(client.dispatch(&mut client_transport, &mut client_app, &mut budget), h1bridge::Disposition::Stop);
    assert_eq!(client.http_state(), HttpState::WaitServerReply);

    pipe(&mut client_transport, &mut server_transport);
    assert_eq!(server.dispatch(&mut server_transport, &mut server_app, &mut budget), h1bridge::Disposition::Stop);
    assert_eq!(server.http_state(), HttpState::WaitAppReply);

    assert_eq!(server_app.inbox.len(), 1);
    let HandoffMessage::Request(meta, payload) = &server_app.inbox[0] else {
        panic!("expected a request handoff");
    };
    assert_eq!(meta.method, Method::Get);
    let got_path = &payload.bytes()[meta.target_path_offset..meta.target_path_offset + meta.target_path_len];
    assert_eq!(got_path, b"hello");

    // The server app replies 200 with a small body.
    let body = b"hi";
    server_app.outbox.push_back(HandoffMessage::Reply(
        ReplyMeta {
            code: 200,
            headers_offset: 0,
            headers_len: 0,
            body_offset: 0,
            body_len: body.len(),
        },
        Payload::Inline(body.to_vec()),
    ));

    assert_eq!(server.dispatch(&mut server_transport, &mut server_app, &mut budget), h1bridge::Disposition::Stop);
    assert_eq!(server.http_state(), HttpState::WaitClientMethod);

    pipe(&mut server_transport, &mut client_transport);
    assert_eq!(client.dispatch(&mut client_transport, &mut client_app, &mut budget), h1bridge::Disposition::Stop);
    assert_eq!(client.http_state(), HttpState::WaitAppMethod);

    assert_eq!(client_app.inbox.len(), 1);
    let HandoffMessage::Reply(meta, payload) = &client_app.inbox[0] else {
        panic!("expected a reply handoff");
    };
    assert_eq!(meta.code, 200);
    assert_eq!(&payload.bytes()[meta.body_offset..meta.body_offset + meta.body_len], b"hi");
}
