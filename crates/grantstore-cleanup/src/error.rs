//! Error types for cleanup operations

use thiserror::Error;

/// Errors that can occur during cleanup operations
#[derive(Error, Debug)]
pub enum CleanupError {
    /// Invalid configuration, rejected before the sweeper starts
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(String),

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}
