//! In-memory implementation of the operational store

use crate::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grantstore_domain::{
    DeviceFlowCode, ExpiredRecord, OperationalStore, PersistedGrant, RecordKind, RecordStore,
};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    grants: HashMap<String, PersistedGrant>,
    device_codes: HashMap<String, DeviceFlowCode>,
}

/// Store backed by process-local hash maps
///
/// Every operation takes the lock once and releases it before returning, so
/// each call is atomic with respect to the others.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Sort expired candidates oldest expiration first and keep `limit` of them
fn oldest_first<T>(
    mut candidates: Vec<T>,
    expiration: impl Fn(&T) -> Option<DateTime<Utc>>,
    limit: usize,
) -> Vec<T> {
    candidates.sort_by_key(|c| expiration(c));
    candidates.truncate(limit);
    candidates
}

#[async_trait]
impl OperationalStore for MemoryStore {
    type Error = StoreError;

    async fn query_expired(
        &self,
        kind: RecordKind,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ExpiredRecord>, Self::Error> {
        let tables = self.read();

        let records = match kind {
            RecordKind::Grants => {
                let expired = tables
                    .grants
                    .values()
                    .filter(|g| g.is_expired(cutoff))
                    .cloned()
                    .collect();
                oldest_first(expired, |g: &PersistedGrant| g.expiration, limit)
                    .into_iter()
                    .map(ExpiredRecord::Grant)
                    .collect()
            }
            RecordKind::DeviceCodes => {
                let expired = tables
                    .device_codes
                    .values()
                    .filter(|c| c.is_expired(cutoff))
                    .cloned()
                    .collect();
                oldest_first(expired, |c: &DeviceFlowCode| c.expiration, limit)
                    .into_iter()
                    .map(ExpiredRecord::DeviceCode)
                    .collect()
            }
        };

        Ok(records)
    }

    async fn delete_by_keys(
        &self,
        kind: RecordKind,
        keys: &[String],
    ) -> Result<Vec<String>, Self::Error> {
        let mut tables = self.write();

        let removed = match kind {
            RecordKind::Grants => keys
                .iter()
                .filter(|key| tables.grants.remove(key.as_str()).is_some())
                .cloned()
                .collect(),
            RecordKind::DeviceCodes => keys
                .iter()
                .filter(|key| tables.device_codes.remove(key.as_str()).is_some())
                .cloned()
                .collect(),
        };

        Ok(removed)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn store_grant(&self, grant: PersistedGrant) -> Result<(), Self::Error> {
        self.write().grants.insert(grant.key.clone(), grant);
        Ok(())
    }

    async fn get_grant(&self, key: &str) -> Result<Option<PersistedGrant>, Self::Error> {
        Ok(self.read().grants.get(key).cloned())
    }

    async fn remove_grant(&self, key: &str) -> Result<bool, Self::Error> {
        Ok(self.write().grants.remove(key).is_some())
    }

    async fn store_device_code(&self, code: DeviceFlowCode) -> Result<(), Self::Error> {
        let mut tables = self.write();
        if tables.device_codes.contains_key(&code.device_code) {
            return Err(StoreError::Duplicate(code.device_code));
        }
        tables.device_codes.insert(code.device_code.clone(), code);
        Ok(())
    }

    async fn get_device_code(
        &self,
        device_code: &str,
    ) -> Result<Option<DeviceFlowCode>, Self::Error> {
        Ok(self.read().device_codes.get(device_code).cloned())
    }

    async fn find_device_code_by_user_code(
        &self,
        user_code: &str,
    ) -> Result<Option<DeviceFlowCode>, Self::Error> {
        Ok(self
            .read()
            .device_codes
            .values()
            .filter(|c| c.user_code == user_code)
            .max_by_key(|c| c.creation_time)
            .cloned())
    }

    async fn remove_device_code(&self, device_code: &str) -> Result<bool, Self::Error> {
        Ok(self.write().device_codes.remove(device_code).is_some())
    }

    async fn count(&self, kind: RecordKind) -> Result<usize, Self::Error> {
        let tables = self.read();
        Ok(match kind {
            RecordKind::Grants => tables.grants.len(),
            RecordKind::DeviceCodes => tables.device_codes.len(),
        })
    }
}
