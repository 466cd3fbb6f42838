//! # vault-pool
//!
//! Named connection pool over `bb8` configured with HikariCP-style settings.
//!
//! ## Features
//!
//! - Max size and minimum idle connections
//! - Connection (acquisition) timeout, idle timeout and max lifetime
//! - Checkout validation through the connection manager
//! - Leak detection for connections held past a threshold
//! - Per-pool metrics and status
//!
//! ## Example
//!
//! ```rust,ignore
//! use vault_pool::{ConnectionPool, PoolConfig};
//!
//! let pool = ConnectionPool::new(manager, PoolConfig::default()).await?;
//! let conn = pool.get().await?;
//! // Connection returned to the pool on drop
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod leak;
pub mod pool;

pub use config::{millis, PoolConfig};
pub use error::PoolError;
pub use leak::{LeakDetector, LeakTask};
pub use pool::{ConnectionPool, PoolStatus, PooledConnection};
