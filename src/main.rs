//! Backend Vault
//!
//! Provides a tuned, named ClickHouse connection pool:
//! - Credentials from the environment, tuning from defaults or config files
//! - Fail-fast startup when ClickHouse is unreachable
//! - Leak detection for long-held connections
//! - Health and pool status endpoints

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpSocket};
use tokio::signal;
use tracing::{error, info};

use api::{limit_concurrency, router, state::HEALTH_CHECK_INTERVAL, AppState};
use clickhouse_client::{data_source, ClickHouseConfig};
use telemetry::{health, init_tracing_from_env};
use vault_pool::PoolConfig;

/// HTTP server settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct ServerConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    /// Maximum in-flight requests
    #[serde(default = "default_max_concurrency")]
    max_concurrency: usize,
    /// TCP listen backlog
    #[serde(default = "default_accept_backlog")]
    accept_backlog: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_concurrency() -> usize {
    200
}

fn default_accept_backlog() -> u32 {
    1000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_concurrency: default_max_concurrency(),
            accept_backlog: default_accept_backlog(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default)]
    server: ServerConfig,

    #[serde(default)]
    datasource: ClickHouseConfig,

    #[serde(default)]
    pool: PoolConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Backend Vault v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(std::env::vars().collect())?;

    info!(
        url = %config.datasource.url,
        username = config.datasource.username.as_deref().unwrap_or("none"),
        "Loaded datasource config"
    );

    // Opens min_idle connections; an unreachable server aborts startup.
    let pool = Arc::new(
        data_source(config.datasource.clone(), config.pool.clone())
            .await
            .context("Failed to create ClickHouse data source")?,
    );

    let state = AppState::new(pool.clone());
    if state.refresh_health().await {
        info!("ClickHouse connection: healthy");
    } else {
        error!("ClickHouse connection: unhealthy");
    }

    let _health_monitor = state.start_health_monitor(HEALTH_CHECK_INTERVAL);
    info!(
        "Started ClickHouse health monitor (every {}s)",
        HEALTH_CHECK_INTERVAL.as_secs()
    );

    let app = limit_concurrency(router(state), config.server.max_concurrency);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = bind(addr, config.server.accept_backlog).context("Failed to bind to address")?;

    info!(backlog = config.server.accept_backlog, "Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down...");
    pool.close();
    health().pool.set_unhealthy("Pool closed");

    info!("Shutdown complete");
    Ok(())
}

/// Bind a listener with an explicit accept backlog.
fn bind(addr: SocketAddr, backlog: u32) -> std::io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)
}

/// Load configuration from files and the given environment variables.
///
/// Values are read as strings; numeric settings are parsed on
/// deserialization so credentials such as `007` stay intact.
fn load_config(env: HashMap<String, String>) -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("BACKENDVAULT")
                .source(Some(env.clone())),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Flat variables for the credentials
    if let Some(url) = env.get("BACKENDVAULT_DATASOURCE_URL") {
        config.datasource.url = url.clone();
    }
    if let Some(username) = env.get("BACKENDVAULT_DATASOURCE_USERNAME") {
        config.datasource.username = Some(username.clone());
    }
    if let Some(password) = env.get("BACKENDVAULT_DATASOURCE_PASSWORD") {
        config.datasource.password = Some(password.clone());
    }

    config.datasource.validate()?;

    Ok(config)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
