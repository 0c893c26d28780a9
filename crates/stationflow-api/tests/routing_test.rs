// Integration tests for `RoutingClient` using wiremock.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stationflow_api::models::LocationRecord;
use stationflow_api::{Error, RoutingClient};

async fn setup() -> (MockServer, RoutingClient) {
    let server = MockServer::start().await;
    let client = RoutingClient::with_client(reqwest::Client::new(), &server.uri()).unwrap();
    (server, client)
}

const FROM: LocationRecord = LocationRecord { lat: 41.0, lng: 29.0 };
const TO: LocationRecord = LocationRecord { lat: 41.05, lng: 29.05 };

#[tokio::test]
async fn test_driving_route_returns_lng_lat_geometry() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/route/v1/driving/29,41;29.05,41.05"))
        .and(query_param("overview", "full"))
        .and(query_param("geometries", "geojson"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "Ok",
            "routes": [{
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[29.0, 41.0], [29.02, 41.03], [29.05, 41.05]]
                },
                "distance": 7342.5,
                "duration": 611.2
            }]
        })))
        .mount(&server)
        .await;

    let route = client.driving_route(FROM, TO).await.unwrap();
    assert_eq!(route.coordinates.len(), 3);
    assert_eq!(route.coordinates[1], [29.02, 41.03]);
    assert!((route.distance_m - 7342.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_no_route_code_is_routing_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "NoRoute",
            "message": "Impossible route between points",
            "routes": []
        })))
        .mount(&server)
        .await;

    let err = client.driving_route(FROM, TO).await.unwrap_err();
    assert!(matches!(err, Error::Routing { ref message } if message.contains("Impossible")));
}

#[tokio::test]
async fn test_empty_routes_is_routing_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": "Ok", "routes": [] })))
        .mount(&server)
        .await;

    assert!(matches!(
        client.driving_route(FROM, TO).await,
        Err(Error::Routing { .. })
    ));
}

#[tokio::test]
async fn test_provider_outage_is_routing_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    assert!(matches!(
        client.driving_route(FROM, TO).await,
        Err(Error::Routing { .. })
    ));
}
