use super::*;
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use std::time::Duration;
use tower::ServiceExt;


/// Helper to create a test MediaRelay instance wrapped in Arc
fn create_test_relay() -> (Arc<MediaRelay>, tempfile::TempDir) {
    let (relay, temp_dir) = crate::relay::test_helpers::create_test_relay();
    (Arc::new(relay), temp_dir)
}

/// Send a JSON POST through a fresh router
async fn post_json(relay: &Arc<MediaRelay>, uri: &str, body: &str) -> axum::response::Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    create_router(relay.clone()).oneshot(request).await.unwrap()
}

/// Send a GET through a fresh router
async fn get(relay: &Arc<MediaRelay>, uri: &str) -> axum::response::Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    create_router(relay.clone()).oneshot(request).await.unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_stops_on_shutdown() {
    let (relay, _temp_dir) = crate::relay::test_helpers::create_test_relay();
    let mut config = (*relay.config).clone();
    // Port 0 = OS assigns a free port
    config.server.bind_address = "127.0.0.1:0".parse().unwrap();
    let relay = Arc::new(MediaRelay::with_components(config, None, None));

    let api_handle = relay.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(100)).await;

    relay.shutdown().await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), api_handle)
        .await
        .expect("server did not stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let (relay, _temp_dir) = create_test_relay();

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = create_router(relay).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS headers should be present"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (relay, _temp_dir) = crate::relay::test_helpers::create_test_relay();
    let mut config = (*relay.config).clone();
    config.server.cors_enabled = false;
    let relay = Arc::new(MediaRelay::with_components(config, None, None));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = create_router(relay).oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[test]
fn test_cors_specific_origins() {
    // Building the layer must not panic on invalid origins
    let _ = build_cors_layer(&[
        "http://localhost:3000".to_string(),
        "not a valid header\u{0}".to_string(),
    ]);
}

#[tokio::test]
async fn test_swagger_ui_toggle() {
    let (relay, _temp_dir) = create_test_relay();
    let response = get(&relay, "/swagger-ui/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut config = (*relay.config).clone();
    config.server.swagger_ui = false;
    let relay = Arc::new(MediaRelay::with_components(config, None, None));
    let response = get(&relay, "/swagger-ui/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (relay, _temp_dir) = create_test_relay();
    let response = get(&relay, "/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
