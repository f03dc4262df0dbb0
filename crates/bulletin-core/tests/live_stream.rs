//! Live channel tests over real HTTP against a mock SSE endpoint.

use std::time::Duration;

use bulletin_core::api::build_http_client;
use bulletin_core::live::{
    ChannelEvent, ChannelOptions, HttpTransport, LiveChannel, SseFrame, Transport,
};
use bulletin_core::{Action, ViewStore, router};
use futures_util::StreamExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

/// The stream as the service emits it: retry preamble, a keepalive, one
/// trigger row, one envelope.
const SSE_BODY: &str = "retry: 5000\ndata: \n\n\
event: ping\ndata: ping\n\n\
event: newsletter\ndata: {\"operation\":\"INSERT\",\"id\":1,\"title\":\"A\",\"content\":\"x\",\"created_at\":\"2024-01-01T00:00:00\"}\n\n\
data: {\"action\":\"update\",\"newsletter\":{\"id\":1,\"title\":\"B\",\"content\":\"y\",\"created_at\":\"2024-01-01T00:00:00\"}}\n\n";

fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body.to_string())
}

#[tokio::test]
async fn test_http_transport_yields_frames() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/newsletter/events"))
        .respond_with(sse_response(SSE_BODY))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(build_http_client(None).unwrap());
    let frames: Vec<SseFrame> = transport
        .connect(&format!("{}/newsletter/events", server.uri()))
        .await
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;

    assert_eq!(frames.len(), 4);
    assert_eq!(frames[0].retry, Some(Duration::from_millis(5000)));
    assert_eq!(frames[1].event, "ping");
    assert_eq!(frames[2].event, "newsletter");
    assert!(frames[3].data.starts_with("{\"action\":\"update\""));
}

#[tokio::test]
async fn test_http_transport_rejects_error_status() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/newsletter/events"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(build_http_client(None).unwrap());
    let result = transport
        .connect(&format!("{}/newsletter/events", server.uri()))
        .await;
    let Err(err) = result else {
        panic!("expected an error for HTTP 401");
    };
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn test_channel_reconciles_store_and_reconnects_after_stream_ends() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/newsletter/events"))
        .respond_with(sse_response(SSE_BODY))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(build_http_client(None).unwrap());
    let options = ChannelOptions {
        reconnect_delay: Duration::from_millis(50),
        ..ChannelOptions::default()
    };
    let mut handle = LiveChannel::open(
        transport,
        format!("{}/newsletter/events", server.uri()),
        options,
    );

    let mut store = ViewStore::new();
    let mut actions = Vec::new();
    for _ in 0..4 {
        let next = tokio::time::timeout(Duration::from_secs(5), handle.recv())
            .await
            .expect("channel delivered in time")
            .expect("channel still open");
        let ChannelEvent::Event(event) = next else {
            panic!("unexpected malformed frame");
        };
        actions.push(event.action);
        router::route(&mut store, event);
    }

    // Two full passes over the body: the channel reconnected once the first
    // response ended.
    assert_eq!(
        actions,
        vec![Action::Create, Action::Update, Action::Create, Action::Update]
    );
    assert_eq!(store.len(), 1);
    let entry = store.get(1).unwrap();
    assert_eq!(entry.newsletter.title, "B");
    assert_eq!(entry.newsletter.content, "y");

    handle.close().await;
    let requests = server.received_requests().await.unwrap();
    assert!(requests.len() >= 2);
}
