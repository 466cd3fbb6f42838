//! bb8 connection manager for ClickHouse.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clickhouse::{Client, Compression};
use tracing::{debug, warn};
use vault_core::{Error, Result};
use vault_pool::PoolConfig;

use crate::config::ClickHouseConfig;
use crate::connection::ClickHouseConnection;
use crate::endpoint::ClickHouseEndpoint;
use crate::properties::{DriverProperties, TransportOptions};

/// Opens and validates ClickHouse connections for the pool.
#[derive(Debug, Clone)]
pub struct ClickHouseConnectionManager {
    endpoint: ClickHouseEndpoint,
    username: String,
    password: String,
    database: Option<String>,
    properties: DriverProperties,
    transport: TransportOptions,
    test_query: Arc<str>,
    validation_timeout: Duration,
}

impl ClickHouseConnectionManager {
    /// Resolve the URL and driver properties into a manager.
    ///
    /// URL query parameters override configured properties and a database
    /// in the URL path overrides the configured one.
    pub fn new(config: &ClickHouseConfig, pool: &PoolConfig) -> Result<Self> {
        config.validate()?;
        let endpoint = ClickHouseEndpoint::parse(&config.url)?;

        let mut properties = config.properties.clone();
        properties.extend(&endpoint.properties);
        let transport = properties.transport()?;

        if !transport.tcp_keep_alive || !transport.tcp_no_delay {
            warn!(
                tcp_keep_alive = transport.tcp_keep_alive,
                tcp_no_delay = transport.tcp_no_delay,
                "The HTTP transport always enables TCP keep-alive and no-delay; ignoring"
            );
        }

        let database = endpoint.database.clone().or_else(|| config.database.clone());

        Ok(Self {
            username: config.username.clone().unwrap_or_default(),
            password: config.password().to_string(),
            database,
            properties,
            transport,
            test_query: pool.connection_test_query.clone(),
            validation_timeout: pool.validation_timeout,
            endpoint,
        })
    }

    /// Build a client with every setting applied.
    pub fn client(&self) -> Client {
        let compression = if self.transport.compression {
            Compression::Lz4
        } else {
            Compression::None
        };

        let mut client = Client::default()
            .with_url(&self.endpoint.url)
            .with_user(&self.username)
            .with_password(&self.password)
            .with_compression(compression);

        if let Some(ref database) = self.database {
            client = client.with_database(database);
        }

        for (name, value) in self.properties.server_settings() {
            client = client.with_option(name, value);
        }

        client
    }

    pub fn endpoint(&self) -> &ClickHouseEndpoint {
        &self.endpoint
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Effective properties after merging URL parameters.
    pub fn properties(&self) -> &DriverProperties {
        &self.properties
    }

    pub fn transport(&self) -> &TransportOptions {
        &self.transport
    }

    pub fn test_query(&self) -> &str {
        &self.test_query
    }

    pub fn validation_timeout(&self) -> Duration {
        self.validation_timeout
    }
}

#[async_trait]
impl bb8::ManageConnection for ClickHouseConnectionManager {
    type Connection = ClickHouseConnection;
    type Error = Error;

    async fn connect(&self) -> Result<ClickHouseConnection> {
        let conn = ClickHouseConnection::new(self.client(), self.transport.socket_timeout);
        conn.validate(&self.test_query, self.validation_timeout)
            .await?;

        debug!(
            url = %self.endpoint.url,
            database = self.database.as_deref().unwrap_or("default"),
            "Opened ClickHouse connection"
        );
        Ok(conn)
    }

    async fn is_valid(&self, conn: &mut ClickHouseConnection) -> Result<()> {
        conn.validate(&self.test_query, self.validation_timeout)
            .await
    }

    fn has_broken(&self, conn: &mut ClickHouseConnection) -> bool {
        conn.is_broken()
    }
}
