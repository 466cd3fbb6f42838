//! In-memory pool metrics.
//!
//! Each connection pool owns one [`PoolMetrics`] instance; the API layer
//! exposes a [`PoolMetricsSnapshot`] of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements without wrapping below zero.
    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
    max: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
            max: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.max.fetch_max(ms, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn max(&self) -> u64 {
        self.max.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Metrics for a single connection pool.
#[derive(Debug, Default)]
pub struct PoolMetrics {
    // Checkout metrics
    pub acquisitions: Counter,
    pub acquisition_timeouts: Counter,
    pub acquisition_errors: Counter,

    // Connection lifecycle
    pub connections_created: Counter,
    pub connection_errors: Counter,

    // Leak detection
    pub leaks_detected: Counter,
    pub leaked_connections: Gauge,

    // Latency histograms
    pub acquire_latency_ms: Histogram,
}

impl PoolMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> PoolMetricsSnapshot {
        PoolMetricsSnapshot {
            timestamp: Utc::now(),
            acquisitions: self.acquisitions.get(),
            acquisition_timeouts: self.acquisition_timeouts.get(),
            acquisition_errors: self.acquisition_errors.get(),
            connections_created: self.connections_created.get(),
            connection_errors: self.connection_errors.get(),
            leaks_detected: self.leaks_detected.get(),
            leaked_connections: self.leaked_connections.get(),
            acquire_latency_mean_ms: self.acquire_latency_ms.mean(),
            acquire_latency_max_ms: self.acquire_latency_ms.max(),
        }
    }
}

/// A snapshot of pool metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolMetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub acquisitions: u64,
    pub acquisition_timeouts: u64,
    pub acquisition_errors: u64,
    pub connections_created: u64,
    pub connection_errors: u64,
    pub leaks_detected: u64,
    pub leaked_connections: u64,
    pub acquire_latency_mean_ms: f64,
    pub acquire_latency_max_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_places_values_in_buckets() {
        let h = Histogram::new();
        h.observe(3);
        h.observe(240);
        h.observe(60_000);

        let buckets = h.buckets();
        assert_eq!(buckets[1], (5, 1));
        assert_eq!(buckets[6], (250, 1));
        assert_eq!(buckets[10], (10000, 1));
        assert_eq!(h.count(), 3);
        assert_eq!(h.max(), 60_000);
    }

    #[test]
    fn gauge_does_not_underflow() {
        let g = Gauge::new();
        g.dec();
        assert_eq!(g.get(), 0);
        g.inc();
        g.inc();
        g.dec();
        assert_eq!(g.get(), 1);
    }

    #[test]
    fn snapshot_reflects_counters() {
        let m = PoolMetrics::new();
        m.acquisitions.inc_by(3);
        m.leaks_detected.inc();
        m.acquire_latency_ms.observe(10);
        m.acquire_latency_ms.observe(30);

        let snap = m.snapshot();
        assert_eq!(snap.acquisitions, 3);
        assert_eq!(snap.leaks_detected, 1);
        assert_eq!(snap.acquire_latency_mean_ms, 20.0);
        assert_eq!(snap.acquire_latency_max_ms, 30);
    }
}
