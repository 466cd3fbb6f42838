//! Pool error types.

use std::time::Duration;

use thiserror::Error;
use vault_core::PoolErrorCode;

/// Errors that can occur during pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Failed to acquire a connection within the timeout.
    #[error("{pool}: connection not available, request timed out after {timeout:?}")]
    AcquisitionTimeout {
        /// Name of the pool.
        pool: String,
        /// Configured connection timeout.
        timeout: Duration,
    },

    /// Pool is closed.
    #[error("pool is closed")]
    PoolClosed,

    /// Opening or validating a connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The initial connections could not be opened.
    #[error("pool initialization failed: {0}")]
    Initialization(String),

    /// Pool configuration error.
    #[error("pool configuration error: {0}")]
    Configuration(String),
}

impl From<PoolError> for vault_core::Error {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::AcquisitionTimeout { .. } => {
                vault_core::Error::pool(PoolErrorCode::Exhausted, err.to_string())
            }
            PoolError::PoolClosed => vault_core::Error::pool(PoolErrorCode::Closed, err.to_string()),
            PoolError::Connection(_) | PoolError::Initialization(_) => vault_core::Error::database(
                vault_core::DbErrorCode::ConnectionFailed,
                err.to_string(),
            ),
            PoolError::Configuration(msg) => vault_core::Error::config(msg),
        }
    }
}
