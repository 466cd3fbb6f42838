//! Unified error types for the data source service.
//!
//! Error codes:
//! - CFG_001: Configuration errors
//! - DB_001-003: Database errors
//! - POOL_001-002: Connection pool errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Database error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorCode {
    /// DB_001: Query failed on the server or in transit
    QueryFailed,
    /// DB_002: Could not open a connection
    ConnectionFailed,
    /// DB_003: Query or validation exceeded its timeout
    Timeout,
}

impl DbErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::QueryFailed => "DB_001",
            Self::ConnectionFailed => "DB_002",
            Self::Timeout => "DB_003",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::QueryFailed => 500,
            Self::ConnectionFailed => 503,
            Self::Timeout => 504,
        }
    }
}

/// Connection pool error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolErrorCode {
    /// POOL_001: No connection became available in time
    Exhausted,
    /// POOL_002: Pool has been closed
    Closed,
}

impl PoolErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Exhausted => "POOL_001",
            Self::Closed => "POOL_002",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        503
    }
}

/// Unified error type for the data source service.
#[derive(Debug, Error)]
pub enum Error {
    /// Database error with code.
    #[error("[{code}] {message}")]
    Database {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Pool error with code.
    #[error("[{code}] {message}")]
    Pool {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    #[error("[CFG_001] configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a database error.
    pub fn database(code: DbErrorCode, msg: impl Into<String>) -> Self {
        Self::Database {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create a pool error.
    pub fn pool(code: PoolErrorCode, msg: impl Into<String>) -> Self {
        Self::Pool {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Database { http_status, .. } => *http_status,
            Self::Pool { http_status, .. } => *http_status,
            Self::Config(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Database { code, .. } => Some(code),
            Self::Pool { code, .. } => Some(code),
            Self::Config(_) => Some("CFG_001"),
            Self::Internal(_) => None,
        }
    }
}
