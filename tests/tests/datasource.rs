//! End-to-end tests of the data source against a real ClickHouse.
//!
//! Requires Docker to be running for testcontainers, or
//! `BACKENDVAULT_TEST_CLICKHOUSE_URL` pointing at a server.

use std::time::Duration;

use axum_test::TestServer;
use clickhouse_client::{data_source, ClickHouseConfig};
use integration_tests::setup::TestContext;
use vault_pool::{PoolConfig, PoolError};

/// Test the pool opens its idle floor at startup
#[tokio::test]
async fn test_pool_opens_min_idle_connections() {
    let ctx = TestContext::new().await;

    let status = ctx.pool.status();
    assert!(status.connections >= 2, "expected min_idle connections, got {:?}", status);
    assert_eq!(status.max, 50);
    assert!(ctx.pool.metrics().connections_created.get() >= 2);
}

/// Test server settings from the driver properties reach ClickHouse
#[tokio::test]
async fn test_driver_properties_applied_as_settings() {
    let ctx = TestContext::new().await;
    let conn = ctx.pool.get().await.expect("Failed to get connection");

    let max_threads: u64 = conn
        .fetch_one("SELECT toUInt64(getSetting('max_threads'))")
        .await
        .expect("Failed to read max_threads");
    assert_eq!(max_threads, 4);

    let block_size: u64 = conn
        .fetch_one("SELECT toUInt64(getSetting('max_insert_block_size'))")
        .await
        .expect("Failed to read max_insert_block_size");
    assert_eq!(block_size, 1_048_576);

    let min_rows: u64 = conn
        .fetch_one("SELECT toUInt64(getSetting('min_insert_block_size_rows'))")
        .await
        .expect("Failed to read min_insert_block_size_rows");
    assert_eq!(min_rows, 500);
}

/// Test the database from the URL is selected
#[tokio::test]
async fn test_database_from_url() {
    let ctx = TestContext::new().await;
    let conn = ctx.pool.get().await.expect("Failed to get connection");

    conn.execute("CREATE TABLE IF NOT EXISTS vault_probe (id UInt32) ENGINE = Memory")
        .await
        .expect("Failed to create table");

    let found: u64 = conn
        .fetch_one("SELECT count() FROM system.tables WHERE database = 'trading' AND name = 'vault_probe'")
        .await
        .expect("Failed to query system.tables");
    assert_eq!(found, 1);
}

/// Test /pool/ping succeeds against a live server
#[tokio::test]
async fn test_ping_endpoint() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/pool/ping").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["pool"], "TradingHikariPool");
}

/// Test checkouts beyond max_size time out after the connection timeout
#[tokio::test]
async fn test_exhausted_pool_times_out() {
    let ctx = TestContext::new().await;

    let config = ClickHouseConfig::new(
        ctx.containers.clickhouse_url.clone(),
        ctx.containers.clickhouse_username.clone(),
        ctx.containers.clickhouse_password.clone(),
    );
    let pool = data_source(config, PoolConfig::default().max_size(1).min_idle(1))
        .await
        .expect("Failed to create data source");

    let _held = pool.get().await.expect("Failed to get connection");
    let started = std::time::Instant::now();
    let err = pool.get().await.err().expect("Second checkout should fail");

    assert!(matches!(err, PoolError::AcquisitionTimeout { .. }));
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(pool.metrics().acquisition_timeouts.get(), 1);
}
