//! Sweep command implementation.

use crate::cli::SweepArgs;
use crate::error::Result;
use grantstore_cleanup::{CleanupConfig, LoggingNotification, SweepReport, TokenCleanup};
use grantstore_store::SqliteStore;
use std::sync::Arc;

/// Execute the sweep command.
pub async fn execute_sweep(
    args: SweepArgs,
    mut config: CleanupConfig,
    store: Arc<SqliteStore>,
) -> Result<SweepReport> {
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }

    let mut cleanup =
        TokenCleanup::new(config, store)?.with_notification(Arc::new(LoggingNotification));
    let report = cleanup.remove_expired().await;

    for (kind, kind_report) in &report.kinds {
        let mut line = format!(
            "{:<14}deleted {} in {} batch(es)",
            kind, kind_report.deleted, kind_report.batches
        );
        if kind_report.limit_reached {
            line.push_str(", batch limit reached");
        }
        if let Some(error) = &kind_report.error {
            line.push_str(&format!(", aborted: {}", error));
        }
        println!("{}", line);
    }
    println!();
    println!("{}", cleanup.metrics().summary());

    Ok(report)
}
