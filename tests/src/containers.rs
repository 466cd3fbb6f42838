//! Testcontainer setup for ClickHouse.

use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

/// Container handle for ClickHouse.
pub struct TestContainers {
    #[allow(dead_code)]
    clickhouse: Option<ContainerAsync<GenericImage>>,
    /// JDBC style URL including the database
    pub clickhouse_url: String,
    pub clickhouse_username: String,
    pub clickhouse_password: String,
}

impl TestContainers {
    /// Start ClickHouse, or reuse the server named by `BACKENDVAULT_TEST_CLICKHOUSE_URL`.
    pub async fn start() -> Self {
        if let Some(url) = std::env::var("BACKENDVAULT_TEST_CLICKHOUSE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            return Self {
                clickhouse: None,
                clickhouse_url: url,
                clickhouse_username: std::env::var("BACKENDVAULT_TEST_CLICKHOUSE_USER")
                    .unwrap_or_else(|_| "default".to_string()),
                clickhouse_password: std::env::var("BACKENDVAULT_TEST_CLICKHOUSE_PASSWORD")
                    .unwrap_or_default(),
            };
        }

        let (clickhouse, http_url) = start_clickhouse().await;
        let jdbc_url = format!(
            "jdbc:clickhouse://{}/trading",
            http_url.trim_start_matches("http://")
        );

        Self {
            clickhouse: Some(clickhouse),
            clickhouse_url: jdbc_url,
            clickhouse_username: "default".to_string(),
            clickhouse_password: String::new(),
        }
    }
}

/// Start ClickHouse container, return container and HTTP URL.
pub async fn start_clickhouse() -> (ContainerAsync<GenericImage>, String) {
    // CLICKHOUSE_DEFAULT_ACCESS_MANAGEMENT=1 allows the passwordless default user
    let image = GenericImage::new("clickhouse/clickhouse-server", "24.3")
        .with_wait_for(WaitFor::seconds(5))
        .with_exposed_port(8123.tcp())
        .with_env_var("CLICKHOUSE_DB", "trading")
        .with_env_var("CLICKHOUSE_DEFAULT_ACCESS_MANAGEMENT", "1")
        .with_env_var("CLICKHOUSE_USER", "default")
        .with_env_var("CLICKHOUSE_PASSWORD", "");

    let container = image.start().await.expect("Failed to start ClickHouse");

    let port = container.get_host_port_ipv4(8123).await.unwrap();
    let url = format!("http://127.0.0.1:{}", port);

    wait_for_http(&url, Duration::from_secs(30)).await;

    (container, url)
}

/// Wait for HTTP endpoint to respond.
async fn wait_for_http(url: &str, timeout: Duration) {
    let client = reqwest::Client::new();
    let start = std::time::Instant::now();

    while start.elapsed() < timeout {
        if let Ok(resp) = client.get(url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    panic!("HTTP endpoint {} not ready after {:?}", url, timeout);
}
