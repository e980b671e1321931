//! # Search Client
//!
//! Entry point for applications using the typed search client.
//!
//! This crate reads the connection settings from the environment and
//! installs the tracing subscriber; everything else lives in
//! `search-client-repository`.

pub mod config;
pub mod telemetry;

pub use config::Dependencies;
pub use search_client_repository as repository;
pub use search_client_shared as shared;

use thiserror::Error;

/// Errors that can occur while setting up the client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] search_client_repository::SearchError),
}

impl ClientError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
