// Push channel tests against a wiremock server speaking text/event-stream.

use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stationflow_api::{PushChannelHandle, PushEvent, PushStatus, ReconnectConfig};

fn sse_body() -> String {
    let station = json!({
        "id": "s1",
        "name": "Kadikoy",
        "type": "bus",
        "location": { "lat": 40.99, "lng": 29.02 },
        "capacity": 40,
        "available": 3,
        "status": "active"
    });
    format!(
        ":ok\n\nevent:heartbeat\ndata:ping\n\nevent:station-update\ndata:{station}\n\n"
    )
}

#[tokio::test]
async fn test_push_channel_decodes_events() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/notifications/subscribe"))
        .and(header("accept", "text/event-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body()),
        )
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/api/notifications/subscribe", server.uri())).unwrap();
    let cancel = CancellationToken::new();
    let handle = PushChannelHandle::connect(
        reqwest::Client::new(),
        url,
        ReconnectConfig::default(),
        cancel.clone(),
    );
    let mut rx = handle.subscribe();

    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(*first, PushEvent::Heartbeat);

    let second = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    match second.as_ref() {
        PushEvent::StationUpdate(record) => {
            assert_eq!(record.id, "s1");
            assert_eq!(record.available, 3);
        }
        other => panic!("unexpected event {other:?}"),
    }

    handle.shutdown();
    let mut status = handle.status();
    tokio::time::timeout(
        Duration::from_secs(5),
        status.wait_for(|s| *s == PushStatus::Closed),
    )
    .await
    .unwrap()
    .unwrap();
}

#[tokio::test]
async fn test_push_channel_gives_up_after_max_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/notifications/subscribe", server.uri())).unwrap();
    let handle = PushChannelHandle::connect(
        reqwest::Client::new(),
        url,
        ReconnectConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(20),
            max_retries: Some(2),
        },
        CancellationToken::new(),
    );

    let mut status = handle.status();
    tokio::time::timeout(
        Duration::from_secs(5),
        status.wait_for(|s| *s == PushStatus::Closed),
    )
    .await
    .unwrap()
    .unwrap();
}
