//! Domain layer for the scoped memoization cache
//!
//! This module contains the scope model, errors, configuration and the port
//! traits implemented by external collaborators.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{CacheError, CacheResult};
