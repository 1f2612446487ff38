//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the sweeper and the storage
//! layer. Implementations live in `grantstore-store`.

use crate::{DeviceFlowCode, ExpiredRecord, PersistedGrant, RecordKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Operations the expiration sweeper needs from a store
///
/// Each call is expected to be atomic on its own; no transaction spans
/// several calls.
#[async_trait]
pub trait OperationalStore: Send + Sync {
    /// Error type for store operations
    type Error: std::fmt::Display + Send + Sync + 'static;

    /// Return up to `limit` records of `kind` whose expiration is set and
    /// not after `cutoff`
    async fn query_expired(
        &self,
        kind: RecordKind,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ExpiredRecord>, Self::Error>;

    /// Delete records of `kind` by key, returning the keys actually removed
    ///
    /// Keys that no longer exist are skipped, not reported as errors.
    async fn delete_by_keys(
        &self,
        kind: RecordKind,
        keys: &[String],
    ) -> Result<Vec<String>, Self::Error>;
}

/// Insert and lookup operations used by issuance and validation paths
#[async_trait]
pub trait RecordStore: OperationalStore {
    /// Insert or replace a grant
    async fn store_grant(&self, grant: PersistedGrant) -> Result<(), Self::Error>;

    /// Get a grant by key
    async fn get_grant(&self, key: &str) -> Result<Option<PersistedGrant>, Self::Error>;

    /// Remove a grant by key, returning whether it existed
    async fn remove_grant(&self, key: &str) -> Result<bool, Self::Error>;

    /// Insert a device flow code
    ///
    /// Fails if the device code already exists; user codes may repeat.
    async fn store_device_code(&self, code: DeviceFlowCode) -> Result<(), Self::Error>;

    /// Get a device flow code by device code
    async fn get_device_code(&self, device_code: &str)
        -> Result<Option<DeviceFlowCode>, Self::Error>;

    /// Find a device flow code by user code
    ///
    /// User codes are not unique; the most recently created match wins.
    async fn find_device_code_by_user_code(
        &self,
        user_code: &str,
    ) -> Result<Option<DeviceFlowCode>, Self::Error>;

    /// Remove a device flow code, returning whether it existed
    async fn remove_device_code(&self, device_code: &str) -> Result<bool, Self::Error>;

    /// Number of stored records of `kind`
    async fn count(&self, kind: RecordKind) -> Result<usize, Self::Error>;
}

/// Receives grants removed by the sweeper, for auditing or eventing
///
/// Called once per deleted batch, after the delete succeeded. Failures are
/// logged by the caller and never undo the delete.
#[async_trait]
pub trait OperationalStoreNotification: Send + Sync {
    /// Handle a batch of removed grants
    async fn persisted_grants_removed(&self, grants: &[PersistedGrant]) -> anyhow::Result<()>;
}
