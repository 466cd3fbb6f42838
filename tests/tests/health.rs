//! Tests for the health and pool endpoints.
//!
//! These run against a pool whose server is unreachable, so no Docker is
//! needed.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::setup::offline_context;

/// Test /health endpoint returns proper structure
#[tokio::test]
async fn test_health_endpoint_structure() {
    let (_pool, router) = offline_context();
    let server = TestServer::new(router).expect("Failed to create test server");

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert!(body.get("status").is_some(), "Response should have 'status' field");
    assert!(
        body.get("clickhouse_connected").is_some(),
        "Response should have 'clickhouse_connected' field"
    );
    assert_eq!(body["pool"]["max"], 50);
    assert_eq!(body["pool"]["in_use"], 0);
}

/// Test /health/live endpoint always returns 200 when service is running
#[tokio::test]
async fn test_live_endpoint() {
    let (_pool, router) = offline_context();
    let server = TestServer::new(router).expect("Failed to create test server");

    server.get("/health/live").await.assert_status_ok();
}

/// Test /health/ready reports unavailable while ClickHouse is unreachable
#[tokio::test]
async fn test_ready_endpoint_unavailable_without_clickhouse() {
    let (pool, router) = offline_context();
    let state = api::AppState::new(pool);
    assert!(!state.refresh_health().await);

    let server = TestServer::new(router).expect("Failed to create test server");
    let response = server.get("/health/ready").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}

/// Test /pool exposes the tuned pool settings
#[tokio::test]
async fn test_pool_endpoint_reports_settings() {
    let (_pool, router) = offline_context();
    let server = TestServer::new(router).expect("Failed to create test server");

    let response = server.get("/pool").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["name"], "TradingHikariPool");

    let config = &body["config"];
    assert_eq!(config["max_size"], 50);
    assert_eq!(config["connection_timeout_ms"], 250);
    assert_eq!(config["validation_timeout_ms"], 250);
    assert_eq!(config["idle_timeout_ms"], 300_000);
    assert_eq!(config["max_lifetime_ms"], 600_000);
    assert_eq!(config["leak_detection_threshold_ms"], 30_000);
    assert_eq!(config["connection_test_query"], "SELECT 1");

    assert!(body["metrics"].get("acquisitions").is_some());
}

/// Test /pool/ping fails with a coded error when no connection can be made
#[tokio::test]
async fn test_ping_fails_without_clickhouse() {
    let (_pool, router) = offline_context();
    let server = TestServer::new(router).expect("Failed to create test server");

    let response = server.get("/pool/ping").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = response.json();
    let code = body["code"].as_str().unwrap_or("");
    assert!(
        code == "POOL_001" || code == "DB_002",
        "Expected a pool or connection error code, got '{}'",
        code
    );
}

/// Test checkouts fail once the pool is closed
#[tokio::test]
async fn test_ping_after_close() {
    let (pool, router) = offline_context();
    pool.close();

    let server = TestServer::new(router).expect("Failed to create test server");
    let response = server.get("/pool/ping").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "POOL_002");
}
