//! Data source factory: credentials and tuning in, configured pool out.

use tracing::info;
use vault_core::Result;
use vault_pool::{millis, ConnectionPool, PoolConfig};

use crate::config::ClickHouseConfig;
use crate::manager::ClickHouseConnectionManager;

/// The ClickHouse connection pool.
pub type ClickHousePool = ConnectionPool<ClickHouseConnectionManager>;

/// Build the ClickHouse pool and open its initial connections.
///
/// Fails when the configuration is invalid or the server cannot be reached
/// within the connection timeout.
pub async fn data_source(clickhouse: ClickHouseConfig, pool: PoolConfig) -> Result<ClickHousePool> {
    let (manager, pool) = prepare(&clickhouse, pool)?;
    let pool = ConnectionPool::new(manager, pool).await?;
    Ok(pool)
}

/// Build the ClickHouse pool without contacting the server.
///
/// Must be called from within a tokio runtime.
pub fn data_source_lazy(clickhouse: ClickHouseConfig, pool: PoolConfig) -> Result<ClickHousePool> {
    let (manager, pool) = prepare(&clickhouse, pool)?;
    let pool = ConnectionPool::new_unchecked(manager, pool)?;
    Ok(pool)
}

fn prepare(
    clickhouse: &ClickHouseConfig,
    pool: PoolConfig,
) -> Result<(ClickHouseConnectionManager, PoolConfig)> {
    let pool = pool.normalize()?;
    let manager = ClickHouseConnectionManager::new(clickhouse, &pool)?;

    info!(
        pool = %pool.pool_name,
        url = %manager.endpoint().url,
        database = manager.database().unwrap_or("default"),
        max_size = pool.max_size,
        min_idle = pool.min_idle,
        connection_timeout_ms = millis(pool.connection_timeout),
        leak_detection_threshold_ms = millis(pool.leak_detection_threshold),
        "Configuring ClickHouse data source"
    );

    Ok((manager, pool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn credentials() -> ClickHouseConfig {
        // Port 1 is never served, connections are refused in the background.
        ClickHouseConfig::new("jdbc:clickhouse://127.0.0.1:1/trading", "default", "")
    }

    #[tokio::test]
    async fn pool_exposes_tuned_settings() {
        let pool = data_source_lazy(credentials(), PoolConfig::default()).unwrap();
        let config = pool.config();

        assert_eq!(pool.name(), "TradingHikariPool");
        assert_eq!(config.max_size, 50);
        assert_eq!(config.min_idle, 10);
        assert_eq!(config.connection_timeout, Duration::from_millis(250));
        assert_eq!(config.validation_timeout, Duration::from_millis(250));
        assert_eq!(config.idle_timeout, Duration::from_millis(300_000));
        assert_eq!(config.max_lifetime, Duration::from_millis(600_000));
        assert_eq!(config.leak_detection_threshold, Duration::from_millis(30_000));
        assert_eq!(&*config.connection_test_query, "SELECT 1");
        assert_eq!(pool.status().max, 50);
    }

    #[tokio::test]
    async fn unreachable_server_fails_startup() {
        let pool = PoolConfig::default().min_idle(1);
        let result = data_source(credentials(), pool).await;

        let err = result.err().unwrap();
        assert_eq!(err.error_code(), Some("DB_002"));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_connecting() {
        let result = data_source_lazy(credentials(), PoolConfig::default().max_size(0));
        assert_eq!(result.err().unwrap().error_code(), Some("CFG_001"));
    }
}
