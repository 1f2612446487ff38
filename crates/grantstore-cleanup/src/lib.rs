//! Grantstore Cleanup
//!
//! Background expiration sweeper for the operational store.
//!
//! # Overview
//!
//! Grants (authorization codes, refresh tokens, reference tokens, consents)
//! and device flow codes carry an optional expiration. The sweeper is
//! responsible for:
//! - **Batched removal**: deleting expired records in bounded batches so
//!   issuance and validation traffic is never blocked behind a large delete
//! - **Scheduling**: running one sweep at a time, on an interval, until stopped
//! - **Failure isolation**: a store error aborts only the record kind being
//!   drained; the next scheduled sweep retries
//! - **Notification**: handing removed grants to an audit sink
//!
//! # Usage
//!
//! ## One-time Sweep
//!
//! ```no_run
//! use std::sync::Arc;
//! use grantstore_cleanup::{CleanupConfig, TokenCleanup};
//! use grantstore_store::SqliteStore;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteStore::new("grants.db")?);
//! let mut cleanup = TokenCleanup::new(CleanupConfig::default(), store)?;
//!
//! let report = cleanup.remove_expired().await;
//! println!("{}", cleanup.metrics().summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Background Worker
//!
//! ```no_run
//! use std::sync::Arc;
//! use grantstore_cleanup::{CleanupConfig, CleanupWorker, LoggingNotification, TokenCleanup};
//! use grantstore_store::SqliteStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(SqliteStore::new("grants.db")?);
//!     let cleanup = TokenCleanup::new(CleanupConfig::default(), store)?
//!         .with_notification(Arc::new(LoggingNotification));
//!     let mut worker = CleanupWorker::new(cleanup);
//!
//!     // Run until Ctrl+C
//!     worker.start()?;
//!     tokio::signal::ctrl_c().await?;
//!     worker.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! [`CleanupConfig`] deserializes with serde; the `grantstore` binary reads
//! it from the `[cleanup]` table of its TOML file:
//!
//! ```toml
//! [cleanup]
//! enabled = true
//! interval_secs = 3600
//! startup_delay_secs = 30
//! batch_size = 100
//! cleanup_grants = true
//! cleanup_device_codes = true
//! max_batches_per_sweep = 1000
//! ```

#![warn(missing_docs)]

mod cleanup;
mod config;
mod error;
mod metrics;
mod notification;
mod worker;

#[cfg(test)]
mod testing;

pub use cleanup::TokenCleanup;
pub use config::CleanupConfig;
pub use error::CleanupError;
pub use metrics::{CleanupMetrics, KindReport, SweepReport};
pub use notification::{LoggingNotification, NoopNotification};
pub use worker::{CleanupWorker, WorkerState};
