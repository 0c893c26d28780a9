// Integration tests for `StationApiClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stationflow_api::models::{FeedbackSubmission, LocationRecord, NewStationRecord};
use stationflow_api::{Error, StationApiClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, StationApiClient) {
    let server = MockServer::start().await;
    let base = format!("{}/api", server.uri());
    let client = StationApiClient::with_client(reqwest::Client::new(), &base).unwrap();
    (server, client)
}

fn station_json(id: &str, available: i64) -> serde_json::Value {
    json!({
        "id": id,
        "name": "Uskudar Iskele",
        "type": "bus",
        "location": { "lat": 41.026, "lng": 29.015 },
        "capacity": 50,
        "available": available,
        "status": "active",
        "lastUpdate": "2025-04-02T08:30:00"
    })
}

// ── Stations ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_stations() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/stations"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([station_json("s1", 10), station_json("s2", 0)])),
        )
        .mount(&server)
        .await;

    let stations = client.list_stations().await.unwrap();

    assert_eq!(stations.len(), 2);
    assert_eq!(stations[0].id, "s1");
    assert_eq!(stations[1].available, 0);
    assert_eq!(stations[0].last_update.as_deref(), Some("2025-04-02T08:30:00"));
}

#[tokio::test]
async fn test_bearer_token_is_sent_once_set() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/stations/my-requests"))
        .and(header("authorization", "Bearer abc.def"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    client.set_token(SecretString::from("abc.def".to_owned()));
    let requests = client.list_my_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_create_station_posts_camel_case_body() {
    let (server, client) = setup().await;

    let expected = json!({
        "name": "Moda Sahil",
        "type": "bike",
        "location": { "lat": 40.98, "lng": 29.03 },
        "capacity": 12,
        "available": 6,
        "status": "active",
        "isCustom": true,
        "ownerId": "u1"
    });

    Mock::given(method("POST"))
        .and(path("/api/stations"))
        .and(body_json(&expected))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "new-1",
            "name": "Moda Sahil",
            "type": "bike",
            "location": { "lat": 40.98, "lng": 29.03 },
            "capacity": 12,
            "available": 6,
            "status": "active",
            "custom": true,
            "ownerId": "u1"
        })))
        .mount(&server)
        .await;

    let created = client
        .create_station(&NewStationRecord {
            name: "Moda Sahil".into(),
            station_type: "bike".into(),
            location: LocationRecord { lat: 40.98, lng: 29.03 },
            capacity: 12,
            available: 6,
            status: "active".into(),
            is_custom: true,
            owner_id: Some("u1".into()),
        })
        .await
        .unwrap();

    assert_eq!(created.id, "new-1");
    assert_eq!(created.is_custom, Some(true));
}

#[tokio::test]
async fn test_delete_station_accepts_empty_body() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/stations/s9"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    client.delete_station("s9").await.unwrap();
}

#[tokio::test]
async fn test_request_update_rejection_surfaces_message() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/stations/s1/request-update"))
        .and(body_json(json!({ "available": 7 })))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "Daily limit reached" })),
        )
        .mount(&server)
        .await;

    let err = client.request_update("s1", 7).await.unwrap_err();
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Daily limit reached");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

// ── Requests ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_update_requests() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/stations/requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "r1",
            "stationId": "s1",
            "stationName": "Uskudar Iskele",
            "userId": "u2",
            "username": "mert",
            "requestedAvailable": 4,
            "status": "PENDING",
            "createdAt": "2025-04-02T09:00:00"
        }])))
        .mount(&server)
        .await;

    let requests = client.list_update_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].requested_available, 4);
    assert_eq!(requests[0].username.as_deref(), Some("mert"));
}

#[tokio::test]
async fn test_approve_request_forbidden_for_non_admin() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/stations/requests/r1/approve"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "message": "Access Denied" })))
        .mount(&server)
        .await;

    let err = client.approve_request("r1").await.unwrap_err();
    assert!(matches!(err, Error::Forbidden { ref message } if message == "Access Denied"));
}

#[tokio::test]
async fn test_reject_request_returns_message() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/stations/requests/r2/reject"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "rejected" })))
        .mount(&server)
        .await;

    let resp = client.reject_request("r2").await.unwrap();
    assert_eq!(resp.message, "rejected");
}

// ── Auth ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sign_in_returns_jwt() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/signin"))
        .and(body_json(json!({ "username": "ayse", "password": "hunter22" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "jwt-token",
            "type": "Bearer",
            "id": "u1",
            "username": "ayse",
            "email": "ayse@example.com",
            "roles": ["ROLE_USER"]
        })))
        .mount(&server)
        .await;

    let jwt = client
        .sign_in("ayse", &SecretString::from("hunter22".to_owned()))
        .await
        .unwrap();
    assert_eq!(jwt.token, "jwt-token");
    assert!(!jwt.is_admin());
}

#[tokio::test]
async fn test_sign_in_bad_credentials() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/signin"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client
        .sign_in("ayse", &SecretString::from("wrong".to_owned()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
}

#[tokio::test]
async fn test_expired_token_maps_to_unauthorized() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/change-password"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client
        .change_password(
            &SecretString::from("old-pass".to_owned()),
            &SecretString::from("new-pass".to_owned()),
        )
        .await
        .unwrap_err();
    assert!(err.is_auth_expired());
}

#[tokio::test]
async fn test_sign_up_field_errors_are_joined() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/signup"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "email": "must be a well-formed email address" })),
        )
        .mount(&server)
        .await;

    let err = client
        .sign_up(
            "mert",
            "not-an-email",
            &SecretString::from("secret1".to_owned()),
            "captcha",
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "API error (HTTP 400): must be a well-formed email address"
    );
}

// ── Feedback ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_submit_feedback_omits_missing_email() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/feedback"))
        .and(body_json(json!({ "message": "The metro markers are great" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Feedback received" })))
        .mount(&server)
        .await;

    let resp = client
        .submit_feedback(&FeedbackSubmission {
            message: "The metro markers are great".into(),
            email: None,
        })
        .await
        .unwrap();
    assert_eq!(resp.message, "Feedback received");
}

#[tokio::test]
async fn test_feedback_rate_limit_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/feedback"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({ "message": "Too many" })))
        .mount(&server)
        .await;

    let err = client
        .submit_feedback(&FeedbackSubmission {
            message: "Another piece of feedback".into(),
            email: Some("a@b.co".into()),
        })
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_delete_missing_feedback_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/feedback/f404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.delete_feedback("f404").await.unwrap_err();
    assert!(err.is_not_found());
}

// ── Malformed responses ─────────────────────────────────────────────

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/feedback"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let err = client.list_feedback().await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert!(body.contains("proxy error")),
        other => panic!("expected Deserialization error, got {other:?}"),
    }
}
