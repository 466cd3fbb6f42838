//! Telemetry for the backend vault: structured logging, component health
//! and connection pool metrics.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
