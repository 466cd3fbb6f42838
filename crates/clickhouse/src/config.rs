//! ClickHouse data source configuration.

use serde::{Deserialize, Serialize};
use vault_core::{Error, Result};

use crate::properties::DriverProperties;

/// ClickHouse data source configuration.
///
/// `url`, `username` and `password` come from the environment; the driver
/// properties default to the tuned values in [`DriverProperties::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickHouseConfig {
    /// ClickHouse URL (JDBC style or plain HTTP)
    #[serde(default)]
    pub url: String,
    /// Username
    pub username: Option<String>,
    /// Password (may be empty)
    pub password: Option<String>,
    /// Database, used when the URL does not name one
    #[serde(default)]
    pub database: Option<String>,
    /// Driver properties
    #[serde(default)]
    pub properties: DriverProperties,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: None,
            password: None,
            database: None,
            properties: DriverProperties::default(),
        }
    }
}

impl ClickHouseConfig {
    /// Configuration with the given credentials and default properties.
    pub fn new(url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.set(key, value);
        self
    }

    /// Check that the credentials needed to connect are present.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::config(
                "datasource url is required (BACKENDVAULT_DATASOURCE_URL)",
            ));
        }
        if self.username.as_deref().map_or(true, |u| u.trim().is_empty()) {
            return Err(Error::config(
                "datasource username is required (BACKENDVAULT_DATASOURCE_USERNAME)",
            ));
        }
        Ok(())
    }

    /// Password, empty when unset.
    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_tuned_properties_and_no_credentials() {
        let config = ClickHouseConfig::default();
        assert!(config.url.is_empty());
        assert_eq!(config.properties, DriverProperties::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn requires_url_and_username() {
        let missing_user = ClickHouseConfig {
            url: "jdbc:clickhouse://localhost:8123/trading".into(),
            ..ClickHouseConfig::default()
        };
        let err = missing_user.validate().unwrap_err();
        assert!(err.to_string().contains("username is required"));

        let ok = ClickHouseConfig::new("jdbc:clickhouse://localhost:8123/trading", "default", "");
        assert!(ok.validate().is_ok());
        assert_eq!(ok.password(), "");
    }

    #[test]
    fn builder_helpers() {
        let config = ClickHouseConfig::new("http://localhost:8123", "trader", "secret")
            .with_database("trading")
            .with_property("max_threads", "16");
        assert_eq!(config.database.as_deref(), Some("trading"));
        assert_eq!(config.properties.get("max_threads"), Some("16"));
        assert_eq!(config.password(), "secret");
    }
}
