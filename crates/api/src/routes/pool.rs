//! Connection pool endpoints.

use axum::{extract::State, Json};
use clickhouse_client::health::ping;
use vault_pool::millis;

use crate::response::{ApiError, PingResponse, PoolResponse};
use crate::state::AppState;

/// GET /pool - Pool configuration, live status and counters.
pub async fn pool_handler(State(state): State<AppState>) -> Json<PoolResponse> {
    let pool = &state.pool;

    Json(PoolResponse {
        name: pool.name().to_string(),
        config: pool.config().clone(),
        status: pool.status(),
        metrics: pool.metrics().snapshot(),
    })
}

/// GET /pool/ping - Check out a connection and run the test query.
pub async fn ping_handler(State(state): State<AppState>) -> Result<Json<PingResponse>, ApiError> {
    let latency = ping(&state.pool).await?;

    Ok(Json(PingResponse {
        pool: state.pool.name().to_string(),
        latency_ms: millis(latency),
    }))
}
