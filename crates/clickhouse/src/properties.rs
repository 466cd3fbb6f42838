//! Driver properties forwarded to the ClickHouse driver.
//!
//! Properties are plain string pairs. Transport keys are interpreted by the
//! client itself; every other key is sent to the server as a setting.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vault_core::{Error, Result};

pub const SOCKET_TIMEOUT: &str = "socket_timeout";
pub const TCP_KEEP_ALIVE: &str = "tcp_keep_alive";
pub const TCP_NO_DELAY: &str = "tcp_no_delay";
pub const COMPRESSION: &str = "compression";
pub const SSL: &str = "ssl";

/// Keys consumed by the client instead of being sent as server settings.
pub const TRANSPORT_KEYS: [&str; 5] = [SOCKET_TIMEOUT, TCP_KEEP_ALIVE, TCP_NO_DELAY, COMPRESSION, SSL];

/// Ordered string properties, like a JDBC `Properties` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverProperties(BTreeMap<String, String>);

impl Default for DriverProperties {
    fn default() -> Self {
        Self::from_pairs([
            // Socket level
            (SOCKET_TIMEOUT, "300000"),
            (TCP_KEEP_ALIVE, "true"),
            (TCP_NO_DELAY, "true"),
            // Query execution
            ("max_execution_time", "60"),
            ("max_threads", "4"),
            (COMPRESSION, "true"),
            // Bulk inserts
            ("max_insert_block_size", "1048576"),
            ("min_insert_block_size_rows", "500"),
        ])
    }
}

impl DriverProperties {
    /// Properties with no entries.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Insert or replace a property, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `other` on top of these properties; `other` wins on conflicts.
    pub fn extend(&mut self, other: &DriverProperties) {
        for (k, v) in other.iter() {
            self.0.insert(k.to_string(), v.to_string());
        }
    }

    /// Entries sent to the server as ClickHouse settings.
    pub fn server_settings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(k, _)| !TRANSPORT_KEYS.contains(k))
    }

    /// Parse the transport keys.
    pub fn transport(&self) -> Result<TransportOptions> {
        let socket_timeout = match self.get(SOCKET_TIMEOUT) {
            None => None,
            Some(raw) => {
                let ms: u64 = raw.trim().parse().map_err(|_| {
                    Error::config(format!(
                        "driver property {SOCKET_TIMEOUT} must be milliseconds, got '{raw}'"
                    ))
                })?;
                (ms > 0).then(|| Duration::from_millis(ms))
            }
        };

        Ok(TransportOptions {
            socket_timeout,
            tcp_keep_alive: self.flag(TCP_KEEP_ALIVE, true)?,
            tcp_no_delay: self.flag(TCP_NO_DELAY, true)?,
            compression: self.flag(COMPRESSION, true)?,
            ssl: self.flag(SSL, false)?,
        })
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => parse_bool(raw).ok_or_else(|| {
                Error::config(format!("driver property {key} must be a boolean, got '{raw}'"))
            }),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        v if v.eq_ignore_ascii_case("true") || v == "1" => Some(true),
        v if v.eq_ignore_ascii_case("false") || v == "0" => Some(false),
        _ => None,
    }
}

/// Client-side options derived from [`DriverProperties`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// Upper bound for one request; `None` waits indefinitely.
    pub socket_timeout: Option<Duration>,
    pub tcp_keep_alive: bool,
    pub tcp_no_delay: bool,
    /// LZ4 compression of request and response bodies.
    pub compression: bool,
    pub ssl: bool,
}
