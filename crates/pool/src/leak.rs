//! Connection leak detection.
//!
//! Every checkout schedules a task that fires after the leak detection
//! threshold. Returning the connection aborts the task; if it already fired,
//! the return is logged so the earlier warning can be matched up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use telemetry::PoolMetrics;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::millis;

/// Schedules leak tasks for one pool.
#[derive(Debug, Clone)]
pub struct LeakDetector {
    pool_name: Arc<str>,
    threshold: Duration,
    metrics: Arc<PoolMetrics>,
}

impl LeakDetector {
    /// A zero threshold disables detection.
    pub fn new(pool_name: Arc<str>, threshold: Duration, metrics: Arc<PoolMetrics>) -> Self {
        Self {
            pool_name,
            threshold,
            metrics,
        }
    }

    /// Whether checkouts are watched at all.
    pub fn is_enabled(&self) -> bool {
        !self.threshold.is_zero()
    }

    /// Configured threshold.
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Start watching a connection that was just checked out.
    ///
    /// Must be called from within a tokio runtime when enabled.
    pub fn schedule(&self) -> LeakTask {
        if !self.is_enabled() {
            return LeakTask::inert();
        }

        let reported = Arc::new(AtomicBool::new(false));
        let checked_out_at = Instant::now();

        let handle = {
            let reported = reported.clone();
            let metrics = self.metrics.clone();
            let pool_name = self.pool_name.clone();
            let threshold = self.threshold;

            tokio::spawn(async move {
                tokio::time::sleep(threshold).await;
                reported.store(true, Ordering::Release);
                metrics.leaks_detected.inc();
                metrics.leaked_connections.inc();
                warn!(
                    pool = %pool_name,
                    threshold_ms = millis(threshold),
                    held_ms = millis(checked_out_at.elapsed()),
                    "Connection leak detection triggered, connection may have been leaked"
                );
            })
        };

        LeakTask {
            handle: Some(handle),
            reported: Some(reported),
            pool_name: Some(self.pool_name.clone()),
            metrics: Some(self.metrics.clone()),
        }
    }
}

/// Guard for one scheduled leak check. Dropping it cancels the check.
#[derive(Debug)]
pub struct LeakTask {
    handle: Option<JoinHandle<()>>,
    reported: Option<Arc<AtomicBool>>,
    pool_name: Option<Arc<str>>,
    metrics: Option<Arc<PoolMetrics>>,
}

impl LeakTask {
    fn inert() -> Self {
        Self {
            handle: None,
            reported: None,
            pool_name: None,
            metrics: None,
        }
    }

    /// Whether a leak warning has been emitted for this checkout.
    pub fn was_reported(&self) -> bool {
        self.reported
            .as_ref()
            .is_some_and(|r| r.load(Ordering::Acquire))
    }
}

impl Drop for LeakTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }

        if self.was_reported() {
            if let Some(metrics) = &self.metrics {
                metrics.leaked_connections.dec();
            }
            info!(
                pool = self.pool_name.as_deref().unwrap_or_default(),
                "Previously reported leaked connection was returned to the pool"
            );
        }
    }
}
