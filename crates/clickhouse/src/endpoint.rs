//! ClickHouse connection URL parsing.
//!
//! Accepts JDBC style URLs (`jdbc:clickhouse://`, `jdbc:ch://`,
//! `jdbc:clickhouse:https://`) as well as plain `clickhouse://`,
//! `http://` and `https://` URLs.

use url::Url;
use vault_core::{Error, Result};

use crate::properties::{DriverProperties, SSL};

const HTTP_PORT: u16 = 8123;
const HTTPS_PORT: u16 = 8443;

/// Where and how to reach the server, as given by the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickHouseEndpoint {
    /// HTTP(S) base URL handed to the client, e.g. `http://host:8123`.
    pub url: String,
    pub host: String,
    pub port: u16,
    pub secure: bool,
    /// Database from the URL path, if any.
    pub database: Option<String>,
    /// Query parameters.
    pub properties: DriverProperties,
}

impl ClickHouseEndpoint {
    /// Parse a ClickHouse URL.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::config("datasource url is empty"));
        }

        let without_jdbc = trimmed.strip_prefix("jdbc:").unwrap_or(trimmed);
        let normalized = ["clickhouse:", "ch:"]
            .iter()
            .find_map(|prefix| {
                without_jdbc
                    .strip_prefix(prefix)
                    .filter(|rest| rest.starts_with("http://") || rest.starts_with("https://"))
            })
            .unwrap_or(without_jdbc);

        let url = Url::parse(normalized)
            .map_err(|e| Error::config(format!("invalid datasource url '{raw}': {e}")))?;

        let mut secure = match url.scheme() {
            "http" | "clickhouse" | "ch" => false,
            "https" => true,
            other => {
                return Err(Error::config(format!(
                    "unsupported datasource url scheme '{other}' in '{raw}'"
                )))
            }
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::config(format!("datasource url '{raw}' has no host")))?
            .to_string();

        let properties = DriverProperties::from_pairs(
            url.query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        );
        if properties.get(SSL).is_some() && properties.transport()?.ssl {
            secure = true;
        }

        let port = url
            .port()
            .unwrap_or(if secure { HTTPS_PORT } else { HTTP_PORT });

        let database = Some(url.path().trim_matches('/'))
            .filter(|db| !db.is_empty())
            .map(str::to_string);

        let scheme = if secure { "https" } else { "http" };

        Ok(Self {
            url: format!("{scheme}://{host}:{port}"),
            host,
            port,
            secure,
            database,
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_jdbc_url_with_database() {
        let ep = ClickHouseEndpoint::parse("jdbc:clickhouse://ch.internal:8123/trading").unwrap();
        assert_eq!(ep.url, "http://ch.internal:8123");
        assert_eq!(ep.host, "ch.internal");
        assert_eq!(ep.port, 8123);
        assert!(!ep.secure);
        assert_eq!(ep.database.as_deref(), Some("trading"));
        assert!(ep.properties.is_empty());
    }

    #[test]
    fn defaults_port_and_database() {
        let ep = ClickHouseEndpoint::parse("jdbc:ch://localhost").unwrap();
        assert_eq!(ep.url, "http://localhost:8123");
        assert_eq!(ep.database, None);
    }

    #[test]
    fn explicit_https_protocol() {
        let ep = ClickHouseEndpoint::parse("jdbc:clickhouse:https://ch.example.com/db").unwrap();
        assert!(ep.secure);
        assert_eq!(ep.url, "https://ch.example.com:8443");
        assert_eq!(ep.database.as_deref(), Some("db"));
    }

    #[test]
    fn ssl_parameter_selects_https() {
        let ep = ClickHouseEndpoint::parse("clickhouse://ch.example.com:9443/db?ssl=true").unwrap();
        assert!(ep.secure);
        assert_eq!(ep.url, "https://ch.example.com:9443");
    }

    #[test]
    fn query_parameters_become_properties() {
        let ep = ClickHouseEndpoint::parse(
            "jdbc:clickhouse://localhost:8123/trading?max_threads=8&socket_timeout=1000",
        )
        .unwrap();
        assert_eq!(ep.properties.get("max_threads"), Some("8"));
        assert_eq!(ep.properties.get("socket_timeout"), Some("1000"));
    }

    #[test]
    fn plain_http_url() {
        let ep = ClickHouseEndpoint::parse("http://127.0.0.1:18123").unwrap();
        assert_eq!(ep.url, "http://127.0.0.1:18123");
        assert_eq!(ep.port, 18123);
    }

    #[test]
    fn rejects_bad_urls() {
        assert!(ClickHouseEndpoint::parse("").is_err());
        assert!(ClickHouseEndpoint::parse("jdbc:mysql://localhost:3306/db").is_err());
        assert!(ClickHouseEndpoint::parse("not a url").is_err());
        assert!(ClickHouseEndpoint::parse("jdbc:clickhouse://localhost/db?ssl=maybe").is_err());
    }
}
