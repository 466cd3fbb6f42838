//! Common test setup functions.

use api::{router, AppState};
use axum::Router;
use clickhouse_client::{data_source, data_source_lazy, ClickHouseConfig, ClickHousePool};
use std::sync::Arc;
use vault_pool::PoolConfig;

use crate::containers::TestContainers;

/// Pool settings for tests: the tuned defaults with a smaller idle floor.
pub fn test_pool_config() -> PoolConfig {
    PoolConfig::default().min_idle(2)
}

/// Router over a pool whose server is never contacted.
///
/// Port 1 is never served, so any checkout fails quickly.
pub fn offline_context() -> (Arc<ClickHousePool>, Router) {
    let config = ClickHouseConfig::new("jdbc:clickhouse://127.0.0.1:1/trading", "default", "");
    let pool = Arc::new(
        data_source_lazy(config, PoolConfig::default().min_idle(0))
            .expect("Failed to create lazy data source"),
    );
    let router = router(AppState::new(pool.clone()));
    (pool, router)
}

/// Test context with a real ClickHouse container.
pub struct TestContext {
    pub containers: TestContainers,
    pub pool: Arc<ClickHousePool>,
    pub router: Router,
}

impl TestContext {
    /// Start ClickHouse and build the pool against it.
    pub async fn new() -> Self {
        let containers = TestContainers::start().await;

        let config = ClickHouseConfig::new(
            containers.clickhouse_url.clone(),
            containers.clickhouse_username.clone(),
            containers.clickhouse_password.clone(),
        );
        let pool = Arc::new(
            data_source(config, test_pool_config())
                .await
                .expect("Failed to create data source"),
        );

        let router = router(AppState::new(pool.clone()));

        Self {
            containers,
            pool,
            router,
        }
    }
}
