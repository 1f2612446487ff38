//! Grantstore CLI - Expiration sweeper for grants and device codes.

use clap::Parser;
use grantstore_cli::commands;
use grantstore_cli::{Cli, Command, FileConfig};
use grantstore_store::SqliteStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> grantstore_cli::Result<()> {
    let cli = Cli::parse();
    grantstore_cli::init_tracing();

    let config = FileConfig::load(cli.config.as_deref(), cli.database)?;
    tracing::debug!(database = %config.database_path.display(), "Opening store");
    let store = Arc::new(SqliteStore::new(&config.database_path)?);

    match cli.command {
        Command::Run => {
            let shutdown = CancellationToken::new();
            let trigger = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                }
                trigger.cancel();
            });
            commands::execute_run(config.cleanup, store, shutdown).await?;
        }
        Command::Sweep(args) => {
            let report = commands::execute_sweep(args, config.cleanup, store).await?;
            if report.has_errors() {
                eprintln!("Warning: some record kinds were not fully swept");
            }
        }
        Command::Stats(args) => {
            commands::execute_stats(args, &store).await?;
        }
    }

    Ok(())
}
