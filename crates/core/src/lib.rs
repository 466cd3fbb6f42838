//! Core error types shared by the backend vault crates.

pub mod error;

pub use error::{DbErrorCode, Error, PoolErrorCode, Result};
