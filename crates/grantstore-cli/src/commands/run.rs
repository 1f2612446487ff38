//! Run command implementation.

use crate::error::Result;
use grantstore_cleanup::{CleanupConfig, CleanupMetrics, CleanupWorker, LoggingNotification, TokenCleanup};
use grantstore_store::SqliteStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Execute the run command.
///
/// Keeps the sweeper running until `shutdown` is cancelled, then stops it
/// and returns the accumulated metrics.
pub async fn execute_run(
    config: CleanupConfig,
    store: Arc<SqliteStore>,
    shutdown: CancellationToken,
) -> Result<CleanupMetrics> {
    let cleanup =
        TokenCleanup::new(config, store)?.with_notification(Arc::new(LoggingNotification));
    let mut worker = CleanupWorker::new(cleanup).with_shutdown_token(shutdown.clone());

    worker.start()?;
    if !worker.is_running() {
        return Ok(worker.metrics());
    }

    shutdown.cancelled().await;
    info!("Shutdown requested, stopping token cleanup");
    worker.stop().await?;

    let metrics = worker.metrics();
    println!("{}", metrics.summary());
    Ok(metrics)
}
