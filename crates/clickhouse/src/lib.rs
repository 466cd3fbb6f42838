//! ClickHouse data source for the backend vault.

pub mod config;
pub mod connection;
pub mod datasource;
pub mod endpoint;
pub mod health;
pub mod manager;
pub mod properties;

pub use config::*;
pub use connection::ClickHouseConnection;
pub use datasource::{data_source, data_source_lazy, ClickHousePool};
pub use endpoint::ClickHouseEndpoint;
pub use manager::ClickHouseConnectionManager;
pub use properties::{DriverProperties, TransportOptions};
