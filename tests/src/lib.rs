//! Shared setup for the backend vault integration tests.

pub mod containers;
pub mod setup;
