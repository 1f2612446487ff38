//! Test doubles shared by the unit tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grantstore_domain::{
    ExpiredRecord, OperationalStore, OperationalStoreNotification, PersistedGrant, RecordKind,
};
use grantstore_store::MemoryStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

/// Records every batch it is notified about
#[derive(Default)]
pub(crate) struct RecordingNotification {
    batches: Mutex<Vec<Vec<PersistedGrant>>>,
}

impl RecordingNotification {
    pub(crate) fn batches(&self) -> Vec<Vec<PersistedGrant>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl OperationalStoreNotification for RecordingNotification {
    async fn persisted_grants_removed(&self, grants: &[PersistedGrant]) -> anyhow::Result<()> {
        self.batches.lock().unwrap().push(grants.to_vec());
        Ok(())
    }
}

/// Fails every notification
pub(crate) struct FailingNotification;

#[async_trait]
impl OperationalStoreNotification for FailingNotification {
    async fn persisted_grants_removed(&self, _grants: &[PersistedGrant]) -> anyhow::Result<()> {
        anyhow::bail!("audit sink unavailable")
    }
}

/// Wraps a [`MemoryStore`] and fails selected operations
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    fail_queries: Option<RecordKind>,
    fail_deletes: Option<RecordKind>,
}

impl FlakyStore {
    pub(crate) fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_queries: None,
            fail_deletes: None,
        }
    }

    pub(crate) fn fail_queries(mut self, kind: RecordKind) -> Self {
        self.fail_queries = Some(kind);
        self
    }

    pub(crate) fn fail_deletes(mut self, kind: RecordKind) -> Self {
        self.fail_deletes = Some(kind);
        self
    }

    pub(crate) fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl OperationalStore for FlakyStore {
    type Error = String;

    async fn query_expired(
        &self,
        kind: RecordKind,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ExpiredRecord>, Self::Error> {
        if self.fail_queries == Some(kind) {
            return Err("connection reset".to_string());
        }
        self.inner
            .query_expired(kind, cutoff, limit)
            .await
            .map_err(|e| e.to_string())
    }

    async fn delete_by_keys(
        &self,
        kind: RecordKind,
        keys: &[String],
    ) -> Result<Vec<String>, Self::Error> {
        if self.fail_deletes == Some(kind) {
            return Err("deadlock detected".to_string());
        }
        self.inner
            .delete_by_keys(kind, keys)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Wraps a [`MemoryStore`], tracks concurrent calls and can hold deletes
/// until released
pub(crate) struct GatedStore {
    inner: MemoryStore,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    deletes: AtomicUsize,
    delete_entered: Arc<Notify>,
    delete_gate: Option<Arc<Semaphore>>,
}

impl GatedStore {
    pub(crate) fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            delete_entered: Arc::new(Notify::new()),
            delete_gate: None,
        }
    }

    /// Block each delete until a permit is added to the returned semaphore
    pub(crate) fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.delete_gate = Some(gate.clone());
        (self, gate)
    }

    pub(crate) fn delete_entered(&self) -> Arc<Notify> {
        self.delete_entered.clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub(crate) fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl OperationalStore for GatedStore {
    type Error = String;

    async fn query_expired(
        &self,
        kind: RecordKind,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ExpiredRecord>, Self::Error> {
        self.enter();
        // Give an overlapping sweep the chance to show up
        tokio::time::sleep(Duration::from_millis(10)).await;
        let result = self
            .inner
            .query_expired(kind, cutoff, limit)
            .await
            .map_err(|e| e.to_string());
        self.exit();
        result
    }

    async fn delete_by_keys(
        &self,
        kind: RecordKind,
        keys: &[String],
    ) -> Result<Vec<String>, Self::Error> {
        self.enter();
        self.delete_entered.notify_one();
        if let Some(gate) = &self.delete_gate {
            gate.acquire().await.map_err(|e| e.to_string())?.forget();
        }
        let result = self
            .inner
            .delete_by_keys(kind, keys)
            .await
            .map_err(|e| e.to_string());
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.exit();
        result
    }
}
