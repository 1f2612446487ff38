//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Grantstore - Operational store maintenance for grants and device codes.
#[derive(Debug, Parser)]
#[command(name = "grantstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "GRANTSTORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database path (overrides `database_path` from the config file)
    #[arg(short, long, global = true, env = "GRANTSTORE_DATABASE")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the background sweeper until Ctrl+C
    Run,

    /// Perform a single sweep and exit
    Sweep(SweepArgs),

    /// Show how many records of each kind are stored
    Stats(StatsArgs),
}

/// Arguments for the sweep command.
#[derive(Debug, Parser)]
pub struct SweepArgs {
    /// Override the configured batch size
    #[arg(short, long)]
    pub batch_size: Option<usize>,
}

/// Arguments for the stats command.
#[derive(Debug, Parser)]
pub struct StatsArgs {
    /// Print counts as JSON
    #[arg(long)]
    pub json: bool,
}
