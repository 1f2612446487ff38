//! Grantstore Storage Layer
//!
//! Implements the `OperationalStore` and `RecordStore` traits for two
//! backends:
//!
//! - [`SqliteStore`]: persistent storage in a single SQLite file
//! - [`MemoryStore`]: process-local maps, used by tests and embedded hosts
//!
//! # Examples
//!
//! ```no_run
//! use grantstore_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for grant and device code operations
//! ```

#![warn(missing_docs)]

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A record with the same unique key already exists
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// The blocking task running a statement panicked or was cancelled
    #[error("Storage task failed: {0}")]
    Task(String),
}
