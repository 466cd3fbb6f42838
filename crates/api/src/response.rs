//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use telemetry::PoolMetricsSnapshot;
use vault_pool::{PoolConfig, PoolStatus};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub clickhouse_connected: bool,
    pub pool: PoolStatus,
}

/// Pool details response.
#[derive(Debug, Serialize, Deserialize)]
pub struct PoolResponse {
    pub name: String,
    pub config: PoolConfig,
    pub status: PoolStatus,
    pub metrics: PoolMetricsSnapshot,
}

/// Pool ping response.
#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub pool: String,
    pub latency_ms: u64,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

/// API error type carrying an error code.
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<vault_core::Error> for ApiError {
    fn from(err: vault_core::Error) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match err.error_code() {
            Some(code) => ApiError::with_code(status, code, err.to_string()),
            None => ApiError::internal(err.to_string()),
        }
    }
}
