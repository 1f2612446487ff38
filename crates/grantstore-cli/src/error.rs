//! Error types for the CLI application.

use crate::config::ConfigError;
use grantstore_cleanup::CleanupError;
use grantstore_store::StoreError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Sweeper error
    #[error("Cleanup error: {0}")]
    Cleanup(#[from] CleanupError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
