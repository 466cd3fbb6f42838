//! API routes.

pub mod health;
pub mod pool;

use axum::{routing::get, Router};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .route("/pool", get(pool::pool_handler))
        .route("/pool/ping", get(pool::ping_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Caps in-flight requests across every route at `max`.
///
/// `Router::layer` wraps each route separately, so the semaphore must be
/// shared rather than created per route.
pub fn limit_concurrency(router: Router, max: usize) -> Router {
    router.layer(GlobalConcurrencyLimitLayer::new(max))
}
