//! Configuration file parsing for the CLI.
//!
//! Loads the database location and the `[cleanup]` table from TOML.

use grantstore_cleanup::{CleanupConfig, CleanupError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration file error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The `[cleanup]` table holds values the sweeper cannot run with
    #[error(transparent)]
    Invalid(#[from] CleanupError),
}

/// Host configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// SQLite database file (default: "grants.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Sweeper settings
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("grants.db")
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            cleanup: CleanupConfig::default(),
        }
    }
}

impl FileConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: FileConfig = toml::from_str(&contents)?;
        config.cleanup.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise, then apply the
    /// command-line database override
    pub fn load(path: Option<&Path>, database: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Some(database) = database {
            config.database_path = database;
        }
        Ok(config)
    }
}
