//! ClickHouse health checks.

use std::time::{Duration, Instant};

use tracing::{debug, error};
use vault_core::Result;
use vault_pool::millis;

use crate::datasource::ClickHousePool;

/// Check ClickHouse connection health.
///
/// Checking a connection out of the pool runs the test query.
pub async fn check_connection(pool: &ClickHousePool) -> bool {
    match ping(pool).await {
        Ok(latency) => {
            debug!(pool = %pool.name(), latency_ms = millis(latency), "ClickHouse connection healthy");
            true
        }
        Err(e) => {
            error!(pool = %pool.name(), "ClickHouse health check failed: {}", e);
            false
        }
    }
}

/// Check out a validated connection, returning how long the checkout took.
///
/// The pool runs the test query on every checkout (freshly opened
/// connections run it in `connect`), so the checkout time includes one
/// test query round trip.
pub async fn ping(pool: &ClickHousePool) -> Result<Duration> {
    let started = Instant::now();
    let _conn = pool.get().await?;
    Ok(started.elapsed())
}
