//! Pool configuration.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PoolError;

/// Default pool name, shown in logs and the status endpoint.
pub const DEFAULT_POOL_NAME: &str = "TradingHikariPool";

/// Default connection test query.
pub const DEFAULT_TEST_QUERY: &str = "SELECT 1";

/// Smallest accepted connection and validation timeout.
pub const MIN_TIMEOUT: Duration = Duration::from_millis(250);

/// Smallest accepted non-zero idle timeout.
pub const MIN_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Smallest accepted non-zero max lifetime.
pub const MIN_LIFETIME: Duration = Duration::from_secs(30);

/// Max lifetime used when a configured value is below [`MIN_LIFETIME`].
pub const FALLBACK_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Smallest accepted non-zero leak detection threshold.
pub const MIN_LEAK_THRESHOLD: Duration = Duration::from_secs(2);

/// Configuration for the connection pool.
///
/// Durations are read and written as whole milliseconds (`*_ms` keys).
/// A zero `idle_timeout`, `max_lifetime` or `leak_detection_threshold`
/// disables the corresponding behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct PoolConfig {
    /// Name used in log fields and the status endpoint.
    pub pool_name: Arc<str>,

    /// Maximum number of connections, idle and in use.
    pub max_size: u32,

    /// Idle connections the pool tries to keep ready.
    pub min_idle: u32,

    /// Time to wait for a connection before timing out.
    #[serde(rename = "connection_timeout_ms", with = "duration_ms")]
    pub connection_timeout: Duration,

    /// Upper bound for one run of the test query.
    #[serde(rename = "validation_timeout_ms", with = "duration_ms")]
    pub validation_timeout: Duration,

    /// Time a connection can sit idle before being closed.
    #[serde(rename = "idle_timeout_ms", with = "duration_ms")]
    pub idle_timeout: Duration,

    /// Maximum lifetime of a connection.
    #[serde(rename = "max_lifetime_ms", with = "duration_ms")]
    pub max_lifetime: Duration,

    /// How long a connection may stay checked out before a leak is reported.
    #[serde(rename = "leak_detection_threshold_ms", with = "duration_ms")]
    pub leak_detection_threshold: Duration,

    /// Query used to validate connections.
    pub connection_test_query: Arc<str>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_name: Arc::from(DEFAULT_POOL_NAME),
            max_size: 50,
            min_idle: 10,
            connection_timeout: Duration::from_millis(250),
            validation_timeout: Duration::from_millis(250),
            idle_timeout: Duration::from_millis(300_000),
            max_lifetime: Duration::from_millis(600_000),
            leak_detection_threshold: Duration::from_millis(30_000),
            connection_test_query: Arc::from(DEFAULT_TEST_QUERY),
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pool name.
    #[must_use]
    pub fn pool_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.pool_name = name.into();
        self
    }

    /// Set the maximum number of connections.
    #[must_use]
    pub fn max_size(mut self, count: u32) -> Self {
        self.max_size = count;
        self
    }

    /// Set the number of idle connections to keep ready.
    #[must_use]
    pub fn min_idle(mut self, count: u32) -> Self {
        self.min_idle = count;
        self
    }

    /// Set the connection acquisition timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the validation timeout.
    #[must_use]
    pub fn validation_timeout(mut self, timeout: Duration) -> Self {
        self.validation_timeout = timeout;
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the maximum connection lifetime.
    #[must_use]
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Set the leak detection threshold.
    #[must_use]
    pub fn leak_detection_threshold(mut self, threshold: Duration) -> Self {
        self.leak_detection_threshold = threshold;
        self
    }

    /// Set the connection test query.
    ///
    /// ```rust
    /// use vault_pool::PoolConfig;
    ///
    /// let config = PoolConfig::new().connection_test_query("SELECT version()");
    /// assert_eq!(&*config.connection_test_query, "SELECT version()");
    /// ```
    #[must_use]
    pub fn connection_test_query(mut self, query: impl Into<Arc<str>>) -> Self {
        self.connection_test_query = query.into();
        self
    }

    /// Idle timeout as bb8 expects it (`None` disables).
    pub fn idle_timeout_opt(&self) -> Option<Duration> {
        non_zero(self.idle_timeout)
    }

    /// Max lifetime as bb8 expects it (`None` disables).
    pub fn max_lifetime_opt(&self) -> Option<Duration> {
        non_zero(self.max_lifetime)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_size == 0 {
            return Err(PoolError::Configuration(
                "max_size must be greater than 0".into(),
            ));
        }
        if self.pool_name.trim().is_empty() {
            return Err(PoolError::Configuration("pool_name must not be empty".into()));
        }
        if self.connection_test_query.trim().is_empty() {
            return Err(PoolError::Configuration(
                "connection_test_query must not be empty".into(),
            ));
        }
        if self.connection_timeout.is_zero() {
            return Err(PoolError::Configuration(
                "connection_timeout must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Validate, then bring out-of-range numeric settings back into range.
    ///
    /// Every adjustment is logged. Settings already in range are untouched.
    pub fn normalize(mut self) -> Result<Self, PoolError> {
        self.validate()?;
        let pool = self.pool_name.clone();

        if self.connection_timeout < MIN_TIMEOUT {
            warn!(pool = %pool, configured_ms = millis(self.connection_timeout), "connection_timeout below minimum, using 250ms");
            self.connection_timeout = MIN_TIMEOUT;
        }

        if self.validation_timeout < MIN_TIMEOUT {
            warn!(pool = %pool, configured_ms = millis(self.validation_timeout), "validation_timeout below minimum, using 250ms");
            self.validation_timeout = MIN_TIMEOUT;
        }

        if self.validation_timeout > self.connection_timeout {
            warn!(pool = %pool, "validation_timeout exceeds connection_timeout, clamping");
            self.validation_timeout = self.connection_timeout;
        }

        if !self.max_lifetime.is_zero() && self.max_lifetime < MIN_LIFETIME {
            warn!(pool = %pool, configured_ms = millis(self.max_lifetime), "max_lifetime below 30s, using 30 minutes");
            self.max_lifetime = FALLBACK_LIFETIME;
        }

        if !self.idle_timeout.is_zero() && self.idle_timeout < MIN_IDLE_TIMEOUT {
            warn!(pool = %pool, configured_ms = millis(self.idle_timeout), "idle_timeout below 10s, using 10s");
            self.idle_timeout = MIN_IDLE_TIMEOUT;
        }

        if !self.max_lifetime.is_zero()
            && !self.idle_timeout.is_zero()
            && self.idle_timeout + Duration::from_secs(1) > self.max_lifetime
        {
            warn!(pool = %pool, "idle_timeout is close to or above max_lifetime, disabling idle retirement");
            self.idle_timeout = Duration::ZERO;
        }

        if !self.leak_detection_threshold.is_zero()
            && (self.leak_detection_threshold < MIN_LEAK_THRESHOLD
                || (!self.max_lifetime.is_zero()
                    && self.leak_detection_threshold > self.max_lifetime))
        {
            warn!(pool = %pool, configured_ms = millis(self.leak_detection_threshold), "leak_detection_threshold out of range, disabling leak detection");
            self.leak_detection_threshold = Duration::ZERO;
        }

        if self.min_idle > self.max_size {
            warn!(pool = %pool, min_idle = self.min_idle, max_size = self.max_size, "min_idle exceeds max_size, clamping");
            self.min_idle = self.max_size;
        }

        Ok(self)
    }
}

fn non_zero(d: Duration) -> Option<Duration> {
    if d.is_zero() {
        None
    } else {
        Some(d)
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Serde adapter storing a [`Duration`] as integer milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(super::millis(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
