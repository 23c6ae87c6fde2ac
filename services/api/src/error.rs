//! services/api/src/error.rs
//!
//! Startup and wiring failures of the `salbabida_api` service. Request-time
//! failures never reach this type; handlers turn `PortError` into a status
//! code themselves.

use crate::config::ConfigError;
use salbabida_core::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Core service error: {0}")]
    Port(#[from] PortError),

    /// Opening the SQLite pool or applying the migrations failed.
    #[error("Local database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The shared HTTP client for the remote services could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Binding the listener or serving connections failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Startup failed: {0}")]
    Internal(String),
}
