//! Core sweep implementation: batched removal of expired records

use crate::{CleanupConfig, CleanupError, CleanupMetrics, KindReport, NoopNotification, SweepReport};
use chrono::{DateTime, Utc};
use grantstore_domain::{
    Clock, ExpiredRecord, OperationalStore, OperationalStoreNotification, PersistedGrant,
    RecordKind, SystemClock,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Removes expired grants and device codes from an operational store
///
/// A sweep captures "now" once, then drains each enabled record kind in
/// bounded batches: query up to `batch_size` expired records, delete exactly
/// those keys, notify the sink about deleted grants, and repeat until a batch
/// comes back short or the batch cap is reached.
///
/// Store failures abort the current kind only; notification failures are
/// logged and never undo a delete. Nothing a sweep encounters is returned
/// as an error.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use grantstore_cleanup::{CleanupConfig, TokenCleanup};
/// use grantstore_store::SqliteStore;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(SqliteStore::new("grants.db")?);
/// let mut cleanup = TokenCleanup::new(CleanupConfig::default(), store)?;
///
/// // Perform a single sweep
/// let report = cleanup.remove_expired().await;
/// println!("removed {} records", report.total_deleted());
/// println!("{}", cleanup.metrics().summary());
/// # Ok(())
/// # }
/// ```
pub struct TokenCleanup<S> {
    config: Arc<CleanupConfig>,
    store: Arc<S>,
    notification: Arc<dyn OperationalStoreNotification>,
    clock: Arc<dyn Clock>,
    metrics: CleanupMetrics,
}

impl<S: OperationalStore> TokenCleanup<S> {
    /// Create a sweeper, validating the configuration
    pub fn new(config: CleanupConfig, store: Arc<S>) -> Result<Self, CleanupError> {
        Self::with_shared_config(Arc::new(config), store)
    }

    /// Create a sweeper from an already shared configuration
    pub fn with_shared_config(
        config: Arc<CleanupConfig>,
        store: Arc<S>,
    ) -> Result<Self, CleanupError> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            notification: Arc::new(NoopNotification),
            clock: Arc::new(SystemClock),
            metrics: CleanupMetrics::new(),
        })
    }

    /// Send removed grants to `notification` instead of discarding them
    #[must_use]
    pub fn with_notification(mut self, notification: Arc<dyn OperationalStoreNotification>) -> Self {
        self.notification = notification;
        self
    }

    /// Use `clock` as the source of "now"
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The configuration this sweeper runs with
    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    /// Get a reference to the cumulative metrics
    pub fn metrics(&self) -> &CleanupMetrics {
        &self.metrics
    }

    /// Perform one full sweep over every enabled record kind
    pub async fn remove_expired(&mut self) -> SweepReport {
        self.sweep(&CancellationToken::new()).await
    }

    /// Perform one full sweep, honoring `cancellation_token` between batches
    ///
    /// A batch whose delete has started always finishes; cancellation is only
    /// observed before the next query.
    #[tracing::instrument(name = "token_cleanup.sweep", skip_all)]
    pub async fn sweep(&mut self, cancellation_token: &CancellationToken) -> SweepReport {
        let started = Instant::now();
        let now = self.clock.now();
        let mut report = SweepReport::default();

        for kind in self.config.enabled_kinds() {
            if cancellation_token.is_cancelled() {
                debug!(kind = %kind, "sweep cancelled before draining");
                break;
            }
            let kind_report = self.drain(kind, now, cancellation_token).await;
            report.kinds.insert(kind, kind_report);
        }

        report.elapsed = started.elapsed();
        self.metrics.record_sweep(&report);

        if report.total_deleted() == 0 {
            debug!("no expired records to clean up");
        } else {
            info!(
                grants = report.deleted(RecordKind::Grants),
                device_codes = report.deleted(RecordKind::DeviceCodes),
                elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
                "cleaned up expired records"
            );
        }

        report
    }

    /// Drain expired persisted grants only
    ///
    /// Runs regardless of `cleanup_grants`; the flag only controls full sweeps.
    pub async fn remove_expired_grants(&mut self) -> Result<KindReport, CleanupError> {
        self.remove_expired_kind(RecordKind::Grants).await
    }

    /// Drain expired device flow codes only
    ///
    /// Runs regardless of `cleanup_device_codes`; the flag only controls full
    /// sweeps.
    pub async fn remove_expired_device_codes(&mut self) -> Result<KindReport, CleanupError> {
        self.remove_expired_kind(RecordKind::DeviceCodes).await
    }

    async fn remove_expired_kind(&mut self, kind: RecordKind) -> Result<KindReport, CleanupError> {
        let now = self.clock.now();
        let report = self.drain(kind, now, &CancellationToken::new()).await;
        self.metrics.record_kind(kind, &report);

        match &report.error {
            Some(e) => Err(CleanupError::Store(e.clone())),
            None => Ok(report),
        }
    }

    /// Batched draining of one kind
    async fn drain(
        &self,
        kind: RecordKind,
        now: DateTime<Utc>,
        cancellation_token: &CancellationToken,
    ) -> KindReport {
        let batch_size = self.config.batch_size;
        let mut report = KindReport::default();

        loop {
            if report.batches >= self.config.max_batches_per_sweep {
                report.limit_reached = true;
                warn!(
                    kind = %kind,
                    batches = report.batches,
                    deleted = report.deleted,
                    "batch limit reached, remaining records are left for the next sweep"
                );
                break;
            }

            if report.batches > 0 && cancellation_token.is_cancelled() {
                report.cancelled = true;
                debug!(kind = %kind, batches = report.batches, "draining cancelled between batches");
                break;
            }

            let records = match self.store.query_expired(kind, now, batch_size).await {
                Ok(records) => records,
                Err(e) => {
                    error!(kind = %kind, error = %e, "failed to query expired records");
                    report.error = Some(e.to_string());
                    break;
                }
            };

            let found = records.len();
            if found == 0 {
                break;
            }

            let keys: Vec<String> = records.iter().map(|r| r.key().to_owned()).collect();
            let removed = match self.store.delete_by_keys(kind, &keys).await {
                Ok(removed) => removed,
                Err(e) => {
                    error!(kind = %kind, error = %e, "failed to delete expired records");
                    report.error = Some(e.to_string());
                    break;
                }
            };

            report.batches += 1;
            report.deleted += removed.len();
            debug!(
                kind = %kind,
                batch = report.batches,
                found,
                removed = removed.len(),
                "removed batch of expired records"
            );

            if kind == RecordKind::Grants && !removed.is_empty() {
                let grants = deleted_grants(records, &removed);
                if let Err(e) = self.notification.persisted_grants_removed(&grants).await {
                    report.notification_failures += 1;
                    warn!(
                        count = grants.len(),
                        error = %e,
                        "failed to notify about removed grants"
                    );
                }
            }

            if found < batch_size {
                break;
            }
        }

        report
    }
}

/// The queried grants whose keys the store reports as removed
fn deleted_grants(records: Vec<ExpiredRecord>, removed: &[String]) -> Vec<PersistedGrant> {
    let removed: HashSet<&str> = removed.iter().map(String::as_str).collect();
    records
        .into_iter()
        .filter(|r| removed.contains(r.key()))
        .filter_map(ExpiredRecord::into_grant)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingNotification, FlakyStore, GatedStore, RecordingNotification};
    use chrono::Duration;
    use grantstore_domain::{grant_types, DeviceFlowCode, MockClock, RecordStore};
    use grantstore_store::MemoryStore;

    fn config(batch_size: usize) -> CleanupConfig {
        CleanupConfig {
            batch_size,
            ..Default::default()
        }
    }

    async fn seed_grants(store: &MemoryStore, now: DateTime<Utc>, expired: usize, live: usize) {
        for i in 0..expired {
            let grant = PersistedGrant::new(grant_types::REFRESH_TOKEN, i.to_string(), "web", now)
                .expires_at(now - Duration::minutes(i as i64 + 1));
            store.store_grant(grant).await.unwrap();
        }
        for i in 0..live {
            let grant = PersistedGrant::new(grant_types::REFRESH_TOKEN, i.to_string(), "web", now)
                .expires_at(now + Duration::minutes(i as i64 + 1));
            store.store_grant(grant).await.unwrap();
        }
    }

    async fn seed_device_codes(store: &MemoryStore, now: DateTime<Utc>, expired: usize) {
        for i in 0..expired {
            let code = DeviceFlowCode::new(format!("device-{i}"), "USER-CODE", "tv", now)
                .expires_at(now - Duration::seconds(1));
            store.store_device_code(code).await.unwrap();
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let store = Arc::new(MemoryStore::new());
        let result = TokenCleanup::new(config(0), store);
        assert!(matches!(result, Err(CleanupError::Config(_))));
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        seed_grants(&store, now, 12, 8).await;
        store
            .store_grant(PersistedGrant::new(grant_types::USER_CONSENT, "x", "web", now))
            .await
            .unwrap();

        let mut cleanup = TokenCleanup::new(config(5), store.clone())
            .unwrap()
            .with_clock(Arc::new(MockClock::new(now)));
        let report = cleanup.remove_expired().await;

        assert_eq!(report.deleted(RecordKind::Grants), 12);
        assert_eq!(report.kinds[&RecordKind::Grants].batches, 3);
        assert_eq!(store.count(RecordKind::Grants).await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_second_sweep_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        seed_grants(&store, now, 7, 3).await;

        let mut cleanup = TokenCleanup::new(config(5), store.clone())
            .unwrap()
            .with_clock(Arc::new(MockClock::new(now)));

        assert_eq!(cleanup.remove_expired().await.total_deleted(), 7);
        let second = cleanup.remove_expired().await;
        assert_eq!(second.total_deleted(), 0);
        assert_eq!(second.kinds[&RecordKind::Grants].batches, 0);
        assert_eq!(cleanup.metrics().sweep_count, 2);
        assert_eq!(cleanup.metrics().total_deleted(), 7);
    }

    #[tokio::test]
    async fn test_exact_multiple_of_batch_size_drains() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        seed_grants(&store, now, 10, 0).await;

        let mut cleanup = TokenCleanup::new(config(5), store.clone())
            .unwrap()
            .with_clock(Arc::new(MockClock::new(now)));
        let report = cleanup.remove_expired().await;

        // Two full batches, then an empty query ends the kind
        assert_eq!(report.deleted(RecordKind::Grants), 10);
        assert_eq!(report.kinds[&RecordKind::Grants].batches, 2);
        assert_eq!(store.count(RecordKind::Grants).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_now_is_captured_once_per_sweep() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        seed_grants(&store, now, 3, 0).await;
        let clock = Arc::new(MockClock::new(now - Duration::hours(1)));

        let mut cleanup = TokenCleanup::new(config(5), store.clone())
            .unwrap()
            .with_clock(clock.clone());
        assert_eq!(cleanup.remove_expired().await.total_deleted(), 0);

        clock.advance(Duration::hours(1));
        assert_eq!(cleanup.remove_expired().await.total_deleted(), 3);
    }

    #[tokio::test]
    async fn test_notifications_match_deleted_grants() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        seed_grants(&store, now, 13, 4).await;
        seed_device_codes(&store, now, 6).await;
        let notification = Arc::new(RecordingNotification::default());

        let mut cleanup = TokenCleanup::new(config(5), store.clone())
            .unwrap()
            .with_clock(Arc::new(MockClock::new(now)))
            .with_notification(notification.clone());
        let report = cleanup.remove_expired().await;

        assert_eq!(report.deleted(RecordKind::Grants), 13);
        assert_eq!(report.deleted(RecordKind::DeviceCodes), 6);

        let batches = notification.batches();
        assert_eq!(batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![5, 5, 3]);
        let notified: HashSet<String> = batches.into_iter().flatten().map(|g| g.key).collect();
        assert_eq!(notified.len(), 13);
        for key in &notified {
            assert!(store.get_grant(key).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_abort() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        seed_grants(&store, now, 11, 0).await;

        let mut cleanup = TokenCleanup::new(config(5), store.clone())
            .unwrap()
            .with_clock(Arc::new(MockClock::new(now)))
            .with_notification(Arc::new(FailingNotification));
        let report = cleanup.remove_expired().await;

        assert_eq!(report.deleted(RecordKind::Grants), 11);
        assert_eq!(report.notification_failures(), 3);
        assert!(!report.has_errors());
        assert_eq!(store.count(RecordKind::Grants).await.unwrap(), 0);
        assert_eq!(cleanup.metrics().notification_failures, 3);
    }

    #[tokio::test]
    async fn test_store_error_aborts_only_that_kind() {
        let inner = MemoryStore::new();
        let now = Utc::now();
        seed_grants(&inner, now, 4, 0).await;
        seed_device_codes(&inner, now, 4).await;
        let store = Arc::new(FlakyStore::new(inner).fail_queries(RecordKind::Grants));

        let mut cleanup = TokenCleanup::new(config(5), store.clone())
            .unwrap()
            .with_clock(Arc::new(MockClock::new(now)));
        let report = cleanup.remove_expired().await;

        assert!(report.kinds[&RecordKind::Grants].error.is_some());
        assert_eq!(report.deleted(RecordKind::Grants), 0);
        assert_eq!(report.deleted(RecordKind::DeviceCodes), 4);
        assert_eq!(cleanup.metrics().store_errors, 1);
        assert_eq!(store.inner().count(RecordKind::Grants).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_delete_error_skips_notification() {
        let inner = MemoryStore::new();
        let now = Utc::now();
        seed_grants(&inner, now, 3, 0).await;
        let store = Arc::new(FlakyStore::new(inner).fail_deletes(RecordKind::Grants));
        let notification = Arc::new(RecordingNotification::default());

        let mut cleanup = TokenCleanup::new(config(5), store)
            .unwrap()
            .with_clock(Arc::new(MockClock::new(now)))
            .with_notification(notification.clone());
        let result = cleanup.remove_expired_grants().await;

        assert!(matches!(result, Err(CleanupError::Store(_))));
        assert!(notification.batches().is_empty());
    }

    #[tokio::test]
    async fn test_batch_limit_bounds_a_sweep() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        seed_grants(&store, now, 20, 0).await;

        let config = CleanupConfig {
            batch_size: 5,
            max_batches_per_sweep: 2,
            ..Default::default()
        };
        let mut cleanup = TokenCleanup::new(config, store.clone())
            .unwrap()
            .with_clock(Arc::new(MockClock::new(now)));

        let report = cleanup.remove_expired().await;
        assert_eq!(report.deleted(RecordKind::Grants), 10);
        assert!(report.kinds[&RecordKind::Grants].limit_reached);
        assert_eq!(store.count(RecordKind::Grants).await.unwrap(), 10);

        // The remainder goes on the next sweeps
        cleanup.remove_expired().await;
        let report = cleanup.remove_expired().await;
        assert_eq!(report.deleted(RecordKind::Grants), 0);
        assert_eq!(store.count(RecordKind::Grants).await.unwrap(), 0);
        assert_eq!(cleanup.metrics().batch_limit_hits, 2);
    }

    #[tokio::test]
    async fn test_disabled_kind_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        seed_grants(&store, now, 2, 0).await;
        seed_device_codes(&store, now, 2).await;

        let config = CleanupConfig {
            cleanup_device_codes: false,
            ..Default::default()
        };
        let mut cleanup = TokenCleanup::new(config, store.clone())
            .unwrap()
            .with_clock(Arc::new(MockClock::new(now)));

        let report = cleanup.remove_expired().await;
        assert!(!report.kinds.contains_key(&RecordKind::DeviceCodes));
        assert_eq!(store.count(RecordKind::DeviceCodes).await.unwrap(), 2);

        // Explicit single-kind calls ignore the flag
        let kind_report = cleanup.remove_expired_device_codes().await.unwrap();
        assert_eq!(kind_report.deleted, 2);
        assert_eq!(store.count(RecordKind::DeviceCodes).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_sweep() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        seed_grants(&store, now, 2, 0).await;

        let mut cleanup = TokenCleanup::new(config(5), store.clone())
            .unwrap()
            .with_clock(Arc::new(MockClock::new(now)));
        let token = CancellationToken::new();
        token.cancel();

        let report = cleanup.sweep(&token).await;
        assert!(report.kinds.is_empty());
        assert_eq!(store.count(RecordKind::Grants).await.unwrap(), 2);
    }

    #[test]
    fn test_deleted_grants_filters_unremoved() {
        let now = Utc::now();
        let a = PersistedGrant::new(grant_types::REFRESH_TOKEN, "1", "web", now);
        let b = PersistedGrant::new(grant_types::REFRESH_TOKEN, "2", "web", now);
        let records = vec![
            ExpiredRecord::Grant(a.clone()),
            ExpiredRecord::Grant(b),
            ExpiredRecord::DeviceCode(DeviceFlowCode::new("dev", "code", "tv", now)),
        ];

        let grants = deleted_grants(records, &[a.key.clone(), "dev".to_string()]);
        assert_eq!(grants, vec![a]);
    }

    #[tokio::test]
    async fn test_cancel_between_batches() {
        let now = Utc::now();
        let inner = MemoryStore::new();
        seed_grants(&inner, now, 5, 0).await;
        let (store, gate) = GatedStore::new(inner).gated();
        let store = Arc::new(store);
        let entered = store.delete_entered();

        let mut cleanup = TokenCleanup::new(config(2), store.clone())
            .unwrap()
            .with_clock(Arc::new(MockClock::new(now)));
        let token = CancellationToken::new();
        let sweep = tokio::spawn({
            let token = token.clone();
            async move {
                let report = cleanup.sweep(&token).await;
                (cleanup, report)
            }
        });

        // Cancel while the first delete is held open, then let it complete
        entered.notified().await;
        token.cancel();
        gate.add_permits(1);
        let (cleanup, report) = sweep.await.unwrap();

        let grants = &report.kinds[&RecordKind::Grants];
        assert!(grants.cancelled);
        assert_eq!(grants.batches, 1);
        assert_eq!(grants.deleted, 2);
        assert!(!report.kinds.contains_key(&RecordKind::DeviceCodes));
        assert_eq!(store.deletes(), 1);
        assert_eq!(store.inner().count(RecordKind::Grants).await.unwrap(), 3);
        assert_eq!(cleanup.metrics().sweep_count, 1);
    }
}
