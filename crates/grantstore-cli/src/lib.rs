//! Grantstore CLI library.
//!
//! Host for the token cleanup sweeper: configuration loading, logging setup
//! and the `run`, `sweep` and `stats` commands.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::{Cli, Command};
pub use config::{ConfigError, FileConfig};
pub use error::{CliError, Result};

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber, logging to stderr.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}
