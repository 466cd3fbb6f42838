//! Application state shared across handlers.

use clickhouse_client::{health::check_connection, ClickHousePool};
use std::sync::Arc;
use std::time::Duration;
use telemetry::health;
use tracing::warn;

/// How often the background monitor re-checks ClickHouse.
pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// ClickHouse connection pool
    pub pool: Arc<ClickHousePool>,
}

impl AppState {
    pub fn new(pool: Arc<ClickHousePool>) -> Self {
        Self { pool }
    }

    /// Run one health check and record the result.
    pub async fn refresh_health(&self) -> bool {
        if self.pool.is_closed() {
            health().pool.set_unhealthy("Pool closed");
        } else {
            health().pool.set_healthy();
        }

        let healthy = check_connection(&self.pool).await;
        if healthy {
            health().clickhouse.set_healthy();
        } else {
            health().clickhouse.set_unhealthy("Connection failed");
        }
        healthy
    }

    /// Start the periodic health check background task.
    /// Returns a handle that can be used to cancel the task.
    pub fn start_health_monitor(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; startup already checked.
            interval.tick().await;
            loop {
                interval.tick().await;
                if !state.refresh_health().await {
                    warn!(pool = %state.pool.name(), "ClickHouse still unhealthy");
                }
            }
        })
    }
}
