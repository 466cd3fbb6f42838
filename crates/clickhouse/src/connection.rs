//! A pooled ClickHouse connection.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clickhouse::Client;
use vault_core::{DbErrorCode, Error, Result};

/// A configured ClickHouse client as handed out by the pool.
///
/// Once a request fails in transit or times out the connection is marked
/// broken and the pool discards it on return.
pub struct ClickHouseConnection {
    client: Client,
    socket_timeout: Option<Duration>,
    broken: AtomicBool,
    created_at: Instant,
}

impl ClickHouseConnection {
    pub(crate) fn new(client: Client, socket_timeout: Option<Duration>) -> Self {
        Self {
            client,
            socket_timeout,
            broken: AtomicBool::new(false),
            created_at: Instant::now(),
        }
    }

    /// Returns the inner clickhouse client.
    ///
    /// Requests made directly on the client are not bounded by the socket
    /// timeout and do not mark the connection broken.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Execute a statement, discarding any result.
    pub async fn execute(&self, sql: &str) -> Result<()> {
        self.bounded(self.client.query(sql).execute(), self.socket_timeout)
            .await
    }

    /// Fetch a single row.
    pub async fn fetch_one<T>(&self, sql: &str) -> Result<T>
    where
        T: clickhouse::Row + for<'b> serde::Deserialize<'b>,
    {
        self.bounded(self.client.query(sql).fetch_one::<T>(), self.socket_timeout)
            .await
    }

    /// Run the test query within `timeout`.
    pub async fn validate(&self, test_query: &str, timeout: Duration) -> Result<()> {
        let limit = match self.socket_timeout {
            Some(socket) => socket.min(timeout),
            None => timeout,
        };
        self.bounded(self.client.query(test_query).execute(), Some(limit))
            .await
    }

    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Relaxed)
    }

    /// Time since the connection was opened.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    async fn bounded<F, T>(&self, fut: F, limit: Option<Duration>) -> Result<T>
    where
        F: Future<Output = clickhouse::error::Result<T>>,
    {
        let outcome = match limit {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.broken.store(true, Ordering::Relaxed);
                    return Err(Error::database(
                        DbErrorCode::Timeout,
                        format!("ClickHouse request timed out after {limit:?}"),
                    ));
                }
            },
            None => fut.await,
        };

        outcome.map_err(|e| {
            if matches!(e, clickhouse::error::Error::Network(_)) {
                self.broken.store(true, Ordering::Relaxed);
                Error::database(DbErrorCode::ConnectionFailed, e.to_string())
            } else {
                Error::database(DbErrorCode::QueryFailed, e.to_string())
            }
        })
    }
}

impl fmt::Debug for ClickHouseConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClickHouseConnection")
            .field("socket_timeout", &self.socket_timeout)
            .field("broken", &self.is_broken())
            .field("age", &self.age())
            .finish()
    }
}
