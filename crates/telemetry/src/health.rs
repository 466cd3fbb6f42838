//! Health check aggregation.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Health status for the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    pub fn is_serving(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }
}

#[derive(Debug, Default)]
struct LastCheck {
    message: Option<String>,
    at: Option<DateTime<Utc>>,
}

/// Health of one component, written by checks and read by probes.
#[derive(Debug)]
pub struct ComponentHealth {
    name: &'static str,
    healthy: AtomicBool,
    last: RwLock<LastCheck>,
}

impl ComponentHealth {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            healthy: AtomicBool::new(false),
            last: RwLock::new(LastCheck {
                message: None,
                at: None,
            }),
        }
    }

    pub fn set_healthy(&self) {
        self.healthy.store(true, Ordering::Relaxed);
        *self.last.write() = LastCheck {
            message: None,
            at: Some(Utc::now()),
        };
    }

    pub fn set_unhealthy(&self, msg: impl Into<String>) {
        self.healthy.store(false, Ordering::Relaxed);
        *self.last.write() = LastCheck {
            message: Some(msg.into()),
            at: Some(Utc::now()),
        };
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn message(&self) -> Option<String> {
        self.last.read().message.clone()
    }

    /// When the component was last reported on; `None` before the first check.
    pub fn checked_at(&self) -> Option<DateTime<Utc>> {
        self.last.read().at
    }

    fn report(&self) -> ComponentHealthReport {
        let last = self.last.read();
        ComponentHealthReport {
            name: self.name.to_string(),
            healthy: self.is_healthy(),
            message: last.message.clone(),
            checked_at: last.at,
        }
    }
}

/// Aggregated health status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealthReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealthReport {
    pub name: String,
    pub healthy: bool,
    pub message: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

/// Global health registry.
pub struct HealthRegistry {
    /// ClickHouse reachability, updated by startup and periodic checks.
    pub clickhouse: ComponentHealth,
    /// Connection pool state (open and serving).
    pub pool: ComponentHealth,
}

impl HealthRegistry {
    pub const fn new() -> Self {
        Self {
            clickhouse: ComponentHealth::new("clickhouse"),
            pool: ComponentHealth::new("pool"),
        }
    }

    /// Generate a health report.
    pub fn report(&self) -> HealthReport {
        let components = vec![self.clickhouse.report(), self.pool.report()];

        let all_healthy = components.iter().all(|c| c.healthy);
        let any_healthy = components.iter().any(|c| c.healthy);

        let status = if all_healthy {
            HealthStatus::Healthy
        } else if any_healthy {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport { status, components }
    }

    /// Check if the service can hand out connections.
    pub fn is_ready(&self) -> bool {
        self.clickhouse.is_healthy() && self.pool.is_healthy()
    }

    /// Check if the service is alive.
    pub fn is_alive(&self) -> bool {
        true
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global health registry.
pub static HEALTH: std::sync::LazyLock<HealthRegistry> =
    std::sync::LazyLock::new(HealthRegistry::new);

/// Get the global health registry.
pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
