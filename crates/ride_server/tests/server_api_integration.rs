//! Integration tests for the ride search API, driven through the router.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use ride_core::catalog::{InMemoryRideCatalog, RideCandidate};
use ride_core::geo::Coordinate;
use ride_core::routing::RouteError;
use ride_core::test_helpers::{offset_north, rider_destination, rider_source, started_ride, ScriptedRouteProvider};
use ride_server::{build_router, ServerConfig, ServerState};
use serde_json::Value;
use tower::ServiceExt;

fn app_with(config: ServerConfig, rides: Vec<RideCandidate>, routes: ScriptedRouteProvider) -> Router {
    let state = ServerState::with_components(
        config,
        Arc::new(InMemoryRideCatalog::from_rides(rides)),
        Arc::new(routes),
    );
    build_router(Arc::new(state))
}

fn app(rides: Vec<RideCandidate>, routes: ScriptedRouteProvider) -> Router {
    app_with(ServerConfig::default(), rides, routes)
}

fn search_uri(path: &str, source: Coordinate, destination: Coordinate) -> String {
    format!(
        "{path}?s_lat={}&s_lng={}&d_lat={}&d_lng={}",
        source.lat(),
        source.lng(),
        destination.lat(),
        destination.lng()
    )
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn search_returns_matching_ride() {
    let rides = vec![
        started_ride("near", offset_north(rider_source(), 200.0), offset_north(rider_destination(), 200.0)),
        started_ride("far", offset_north(rider_source(), 8_000.0), offset_north(rider_destination(), 8_000.0)),
    ];
    let uri = search_uri("/api/v1/rides/search", rider_source(), rider_destination());

    let (status, body) = get(app(rides, ScriptedRouteProvider::new()), &uri).await;

    assert_eq!(status, StatusCode::OK);
    let rides = body["rides"].as_array().expect("rides array");
    assert_eq!(rides.len(), 1);
    assert_eq!(rides[0]["id"], "near");
    let source = rides[0]["source"].as_array().expect("[lat, lng]");
    assert_eq!(source.len(), 2);
}

#[tokio::test]
async fn no_matches_is_an_empty_list() {
    let uri = search_uri("/api/v1/rides/search", rider_source(), rider_destination());
    let (status, body) = get(app(Vec::new(), ScriptedRouteProvider::new()), &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rides"], serde_json::json!([]));
}

#[tokio::test]
async fn tolerance_parameter_narrows_results() {
    let rides = vec![started_ride(
        "near",
        offset_north(rider_source(), 200.0),
        offset_north(rider_destination(), 200.0),
    )];
    let uri = format!(
        "{}&tolerance_m=50",
        search_uri("/api/v1/rides/search", rider_source(), rider_destination())
    );

    let (status, body) = get(app(rides, ScriptedRouteProvider::new()), &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rides"], serde_json::json!([]));
}

#[tokio::test]
async fn legacy_path_is_served() {
    let rides = vec![started_ride("exact", rider_source(), rider_destination())];
    let uri = search_uri("/search_rides", rider_source(), rider_destination());

    let (status, body) = get(app(rides, ScriptedRouteProvider::new()), &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rides"][0]["id"], "exact");
}

#[tokio::test]
async fn out_of_range_latitude_is_bad_request() {
    let uri = "/api/v1/rides/search?s_lat=95.0&s_lng=77.59&d_lat=12.93&d_lng=77.62";
    let (status, body) = get(app(Vec::new(), ScriptedRouteProvider::new()), uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().expect("error message").contains("95"));
}

#[tokio::test]
async fn missing_parameter_is_bad_request() {
    let uri = "/api/v1/rides/search?s_lat=12.97&s_lng=77.59&d_lat=12.93";
    let (status, body) = get(app(Vec::new(), ScriptedRouteProvider::new()), uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().expect("error message").contains("d_lng"));
}

#[tokio::test]
async fn non_numeric_parameter_is_bad_request() {
    let uri = "/api/v1/rides/search?s_lat=north&s_lng=77.59&d_lat=12.93&d_lng=77.62";
    let (status, body) = get(app(Vec::new(), ScriptedRouteProvider::new()), uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn rider_route_failure_is_bad_gateway() {
    let routes = ScriptedRouteProvider::new().with_failure(rider_source(), rider_destination(), RouteError::NoRoute);
    let uri = search_uri("/api/v1/rides/search", rider_source(), rider_destination());

    let (status, body) = get(app(Vec::new(), routes), &uri).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn rider_route_timeout_is_gateway_timeout() {
    let mut config = ServerConfig::default();
    config.matching.route_timeout_ms = 20;
    let routes = ScriptedRouteProvider::new().with_delay(
        rider_source(),
        rider_destination(),
        Duration::from_millis(500),
    );
    let uri = search_uri("/api/v1/rides/search", rider_source(), rider_destination());

    let (status, _) = get(app_with(config, Vec::new(), routes), &uri).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn search_past_deadline_is_gateway_timeout_with_json_body() {
    let mut config = ServerConfig::default();
    config.timeout_secs = 1;
    config.matching.max_concurrent_route_fetches = 1;

    let mut routes = ScriptedRouteProvider::new();
    let mut rides = Vec::new();
    for i in 0..3 {
        let source = offset_north(rider_source(), 100.0 * f64::from(i + 1));
        let destination = offset_north(rider_destination(), 100.0 * f64::from(i + 1));
        routes = routes.with_delay(source, destination, Duration::from_millis(700));
        rides.push(started_ride(&format!("slow-{i}"), source, destination));
    }
    let uri = search_uri("/api/v1/rides/search", rider_source(), rider_destination());

    let (status, body) = get(app_with(config, rides, routes), &uri).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(body["error"].as_str().expect("error message").contains("timed out"));
}

#[tokio::test]
async fn failing_candidate_does_not_fail_the_search() {
    let broken_source = offset_north(rider_source(), 100.0);
    let broken_destination = offset_north(rider_destination(), 100.0);
    let rides = vec![
        started_ride("broken", broken_source, broken_destination),
        started_ride("exact", rider_source(), rider_destination()),
    ];
    let routes = ScriptedRouteProvider::new().with_failure(
        broken_source,
        broken_destination,
        RouteError::Upstream("OVER_QUERY_LIMIT".to_string()),
    );
    let uri = search_uri("/api/v1/rides/search", rider_source(), rider_destination());

    let (status, body) = get(app(rides, routes), &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rides"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["rides"][0]["id"], "exact");
}

#[tokio::test]
async fn health_and_ready_respond() {
    let (status, body) = get(app(Vec::new(), ScriptedRouteProvider::new()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = get(app(Vec::new(), ScriptedRouteProvider::new()), "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matching"]["default_tolerance_m"], 1000.0);
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let (status, body) = get(app(Vec::new(), ScriptedRouteProvider::new()), "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn state_seeded_from_catalog_file_serves_matches() {
    let config = ServerConfig {
        catalog_path: Some(concat!(env!("CARGO_MANIFEST_DIR"), "/rides.sample.json").to_string()),
        ..ServerConfig::default()
    };
    let state = ServerState::new(config).expect("state from sample catalog");
    let app = build_router(Arc::new(state));
    let uri = search_uri("/api/v1/rides/search", rider_source(), rider_destination());

    let (status, body) = get(app, &uri).await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["rides"]
        .as_array()
        .expect("rides array")
        .iter()
        .filter_map(|ride| ride["id"].as_str())
        .collect();
    assert_eq!(ids, ["ride-mg-road-koramangala"]);
}

#[test]
fn missing_catalog_file_fails_startup() {
    let config = ServerConfig {
        catalog_path: Some("/nonexistent/rides.json".to_string()),
        ..ServerConfig::default()
    };
    assert!(ServerState::new(config).is_err());
}
