//! HTTP API layer: health probes and pool status.

pub mod response;
pub mod routes;
pub mod state;

pub use routes::{limit_concurrency, router};
pub use state::AppState;
