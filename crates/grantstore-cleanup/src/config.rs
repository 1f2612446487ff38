//! Configuration for token cleanup
//!
//! Defines the sweep schedule, batch size and which record kinds are drained.

use crate::CleanupError;
use grantstore_domain::RecordKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the expiration sweeper
///
/// Built once at process start and never changed afterwards; a new sweeper
/// must be created to change behavior.
///
/// # Examples
///
/// ```
/// use grantstore_cleanup::CleanupConfig;
///
/// let config = CleanupConfig::default();
/// assert_eq!(config.batch_size, 100);
/// assert!(config.validate().is_ok());
///
/// let config = CleanupConfig { batch_size: 0, ..Default::default() };
/// assert!(config.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleanupConfig {
    /// Whether the background sweeper runs at all
    /// Default: true
    pub enabled: bool,

    /// Seconds to wait between the end of one sweep and the start of the next
    /// Default: 3600 (hourly)
    pub interval_secs: u64,

    /// Seconds to wait after start before the first sweep
    /// Default: 0
    pub startup_delay_secs: u64,

    /// Maximum records queried and deleted per batch
    /// Default: 100
    pub batch_size: usize,

    /// Sweep expired persisted grants
    /// Default: true
    pub cleanup_grants: bool,

    /// Sweep expired device flow codes
    /// Default: true
    pub cleanup_device_codes: bool,

    /// Maximum full batches drained per kind in one sweep
    ///
    /// Bounds a sweep under continuous insert load; anything left over is
    /// picked up by the next sweep.
    /// Default: 1000
    pub max_batches_per_sweep: usize,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
            startup_delay_secs: 0,
            batch_size: 100,
            cleanup_grants: true,
            cleanup_device_codes: true,
            max_batches_per_sweep: 1000,
        }
    }
}

impl CleanupConfig {
    /// Check the configuration, rejecting values the sweeper cannot run with
    pub fn validate(&self) -> Result<(), CleanupError> {
        if self.interval_secs == 0 {
            return Err(CleanupError::Config(
                "interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(CleanupError::Config(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        if self.max_batches_per_sweep == 0 {
            return Err(CleanupError::Config(
                "max_batches_per_sweep must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get sweep interval as Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Get startup delay as Duration
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    /// Whether a record kind is swept
    pub fn is_enabled(&self, kind: RecordKind) -> bool {
        match kind {
            RecordKind::Grants => self.cleanup_grants,
            RecordKind::DeviceCodes => self.cleanup_device_codes,
        }
    }

    /// Record kinds swept, in sweep order
    pub fn enabled_kinds(&self) -> Vec<RecordKind> {
        RecordKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }
}
