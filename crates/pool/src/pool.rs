//! Connection pool implementation.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bb8::{ManageConnection, RunError};
use serde::{Deserialize, Serialize};
use telemetry::PoolMetrics;
use tracing::{debug, info, trace, warn};

use crate::config::{millis, PoolConfig};
use crate::error::PoolError;
use crate::leak::{LeakDetector, LeakTask};

/// A named connection pool.
///
/// Pooling itself (acquisition queue, idle reaping, lifetime retirement,
/// checkout validation) is done by `bb8`. This type applies [`PoolConfig`],
/// adds leak detection and keeps per-pool metrics.
pub struct ConnectionPool<M: ManageConnection> {
    inner: bb8::Pool<M>,
    config: Arc<PoolConfig>,
    leak_detector: LeakDetector,
    metrics: Arc<PoolMetrics>,
    closed: Arc<AtomicBool>,
}

impl<M: ManageConnection> Clone for ConnectionPool<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: self.config.clone(),
            leak_detector: self.leak_detector.clone(),
            metrics: self.metrics.clone(),
            closed: self.closed.clone(),
        }
    }
}

impl<M> ConnectionPool<M>
where
    M: ManageConnection,
    M::Error: fmt::Display,
{
    /// Build the pool and open `min_idle` connections before returning.
    ///
    /// Fails if the initial connections cannot be opened within the
    /// connection timeout.
    pub async fn new(manager: M, config: PoolConfig) -> Result<Self, PoolError> {
        let config = config.normalize()?;
        let metrics = Arc::new(PoolMetrics::new());

        let inner = builder::<M>(&config, &metrics)
            .build(manager)
            .await
            .map_err(|e| {
                PoolError::Initialization(format!("{}: {}", config.pool_name, e))
            })?;

        let pool = Self::from_parts(inner, config, metrics);
        let status = pool.status();
        info!(
            pool = %pool.name(),
            max_size = status.max,
            connections = status.connections,
            "Connection pool started"
        );
        Ok(pool)
    }

    /// Build the pool without waiting for any connection.
    ///
    /// Must be called from within a tokio runtime; `min_idle` connections
    /// are opened in the background.
    pub fn new_unchecked(manager: M, config: PoolConfig) -> Result<Self, PoolError> {
        let config = config.normalize()?;
        let metrics = Arc::new(PoolMetrics::new());
        let inner = builder::<M>(&config, &metrics).build_unchecked(manager);

        debug!(pool = %config.pool_name, "Connection pool created lazily");
        Ok(Self::from_parts(inner, config, metrics))
    }

    fn from_parts(inner: bb8::Pool<M>, config: PoolConfig, metrics: Arc<PoolMetrics>) -> Self {
        let leak_detector = LeakDetector::new(
            config.pool_name.clone(),
            config.leak_detection_threshold,
            metrics.clone(),
        );

        Self {
            inner,
            config: Arc::new(config),
            leak_detector,
            metrics,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a connection from the pool.
    ///
    /// Returns an idle connection, or opens a new one while under
    /// `max_size`. Otherwise waits until a connection is returned, failing
    /// with [`PoolError::AcquisitionTimeout`] after `connection_timeout`.
    /// Every connection is validated before it is handed out.
    pub async fn get(&self) -> Result<PooledConnection<'_, M>, PoolError> {
        if self.is_closed() {
            return Err(PoolError::PoolClosed);
        }

        trace!(pool = %self.name(), "acquiring connection from pool");
        let started = Instant::now();

        match self.inner.get().await {
            Ok(conn) => {
                let waited = started.elapsed();
                self.metrics.acquisitions.inc();
                self.metrics
                    .acquire_latency_ms
                    .observe(millis(waited));

                Ok(PooledConnection {
                    conn,
                    _leak: self.leak_detector.schedule(),
                })
            }
            Err(RunError::TimedOut) => {
                self.metrics.acquisition_timeouts.inc();
                let status = self.status();
                warn!(
                    pool = %self.name(),
                    timeout_ms = millis(self.config.connection_timeout),
                    connections = status.connections,
                    idle = status.idle,
                    "Connection not available, request timed out"
                );
                Err(PoolError::AcquisitionTimeout {
                    pool: self.name().to_string(),
                    timeout: self.config.connection_timeout,
                })
            }
            Err(RunError::User(e)) => {
                self.metrics.acquisition_errors.inc();
                warn!(pool = %self.name(), error = %e, "Failed to acquire connection");
                Err(PoolError::Connection(e.to_string()))
            }
        }
    }
}

impl<M: ManageConnection> ConnectionPool<M> {
    /// Get the current pool status.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let state = self.inner.state();
        PoolStatus {
            connections: state.connections,
            idle: state.idle_connections,
            in_use: state.connections.saturating_sub(state.idle_connections),
            max: self.config.max_size,
            closed: self.is_closed(),
        }
    }

    /// Close the pool.
    ///
    /// New checkouts fail with [`PoolError::PoolClosed`]. Connections are
    /// released once every clone of the pool and every checked-out
    /// connection has been dropped.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(pool = %self.name(), "Connection pool closed");
        }
    }

    /// Check if the pool is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Pool name from the configuration.
    pub fn name(&self) -> &str {
        &self.config.pool_name
    }

    /// Get the effective (normalized) pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Per-pool metrics.
    pub fn metrics(&self) -> &Arc<PoolMetrics> {
        &self.metrics
    }
}

fn builder<M>(config: &PoolConfig, metrics: &Arc<PoolMetrics>) -> bb8::Builder<M>
where
    M: ManageConnection,
    M::Error: fmt::Display,
{
    bb8::Pool::builder()
        .max_size(config.max_size)
        .min_idle(Some(config.min_idle))
        .connection_timeout(config.connection_timeout)
        .idle_timeout(config.idle_timeout_opt())
        .max_lifetime(config.max_lifetime_opt())
        .test_on_check_out(true)
        .error_sink(Box::new(TracingErrorSink {
            pool_name: config.pool_name.clone(),
            metrics: metrics.clone(),
        }))
        .connection_customizer(Box::new(CountCreated {
            metrics: metrics.clone(),
        }))
}

/// Logs background connection errors reported by bb8.
#[derive(Debug, Clone)]
struct TracingErrorSink {
    pool_name: Arc<str>,
    metrics: Arc<PoolMetrics>,
}

impl<E: fmt::Display + 'static> bb8::ErrorSink<E> for TracingErrorSink {
    fn sink(&self, error: E) {
        self.metrics.connection_errors.inc();
        warn!(pool = %self.pool_name, error = %error, "Connection error");
    }

    fn boxed_clone(&self) -> Box<dyn bb8::ErrorSink<E>> {
        Box::new(self.clone())
    }
}

/// Counts connections as bb8 opens them.
#[derive(Debug)]
struct CountCreated {
    metrics: Arc<PoolMetrics>,
}

#[async_trait]
impl<C: Send + 'static, E: 'static> bb8::CustomizeConnection<C, E> for CountCreated {
    async fn on_acquire(&self, _connection: &mut C) -> Result<(), E> {
        self.metrics.connections_created.inc();
        Ok(())
    }
}

/// Status information about the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Total number of open connections.
    pub connections: u32,
    /// Number of idle connections available.
    pub idle: u32,
    /// Number of connections currently checked out.
    pub in_use: u32,
    /// Maximum allowed connections.
    pub max: u32,
    /// Whether the pool has been closed.
    pub closed: bool,
}

/// A connection checked out of the pool.
///
/// When dropped, the connection is returned to the pool and its leak check
/// is cancelled.
pub struct PooledConnection<'a, M: ManageConnection> {
    conn: bb8::PooledConnection<'a, M>,
    _leak: LeakTask,
}

impl<M: ManageConnection> Deref for PooledConnection<'_, M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl<M: ManageConnection> DerefMut for PooledConnection<'_, M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}
