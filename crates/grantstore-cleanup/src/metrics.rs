//! Metrics collection for cleanup operations

use grantstore_domain::RecordKind;
use std::collections::BTreeMap;
use std::time::Duration;

/// Outcome of draining one record kind during a sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindReport {
    /// Records deleted
    pub deleted: usize,

    /// Query+delete batches that returned at least one record
    pub batches: usize,

    /// Notification calls that failed
    pub notification_failures: usize,

    /// Whether draining stopped at `max_batches_per_sweep` after a full batch
    pub limit_reached: bool,

    /// Whether draining stopped early because of cancellation
    pub cancelled: bool,

    /// Store error that aborted this kind, if any
    pub error: Option<String>,
}

/// Outcome of one full sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Per-kind results, for the kinds that were visited
    pub kinds: BTreeMap<RecordKind, KindReport>,

    /// Wall time spent in the sweep
    pub elapsed: Duration,
}

impl SweepReport {
    /// Records deleted for one kind
    pub fn deleted(&self, kind: RecordKind) -> usize {
        self.kinds.get(&kind).map_or(0, |k| k.deleted)
    }

    /// Records deleted across all kinds
    pub fn total_deleted(&self) -> usize {
        self.kinds.values().map(|k| k.deleted).sum()
    }

    /// Whether any kind was aborted by a store error
    pub fn has_errors(&self) -> bool {
        self.kinds.values().any(|k| k.error.is_some())
    }

    /// Failed notification calls across all kinds
    pub fn notification_failures(&self) -> usize {
        self.kinds.values().map(|k| k.notification_failures).sum()
    }
}

/// Cumulative metrics across sweeps
///
/// Tracks deletions per kind, batches, failures and runtime.
#[derive(Debug, Clone, Default)]
pub struct CleanupMetrics {
    /// Records deleted per kind
    pub deleted: BTreeMap<RecordKind, usize>,

    /// Non-empty batches processed
    pub batches: usize,

    /// Completed sweeps
    pub sweep_count: usize,

    /// Kinds aborted by store errors
    pub store_errors: usize,

    /// Failed notification calls
    pub notification_failures: usize,

    /// Times a kind hit the per-sweep batch cap
    pub batch_limit_hits: usize,

    /// Total time spent sweeping, in milliseconds
    pub total_runtime_ms: u64,
}

impl CleanupMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the result of draining one kind into the totals
    pub fn record_kind(&mut self, kind: RecordKind, report: &KindReport) {
        *self.deleted.entry(kind).or_insert(0) += report.deleted;
        self.batches += report.batches;
        self.notification_failures += report.notification_failures;
        if report.error.is_some() {
            self.store_errors += 1;
        }
        if report.limit_reached {
            self.batch_limit_hits += 1;
        }
    }

    /// Fold a sweep report into the totals
    pub fn record_sweep(&mut self, report: &SweepReport) {
        for (kind, kind_report) in &report.kinds {
            self.record_kind(*kind, kind_report);
        }
        self.total_runtime_ms += u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX);
        self.sweep_count += 1;
    }

    /// Get total records deleted across all kinds
    pub fn total_deleted(&self) -> usize {
        self.deleted.values().sum()
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Token Cleanup Metrics Summary".to_string(),
            "=============================".to_string(),
            format!("Sweep cycles: {}", self.sweep_count),
            format!("Batches: {}", self.batches),
            format!("Total runtime: {}ms", self.total_runtime_ms),
            String::new(),
        ];

        if !self.deleted.is_empty() {
            lines.push("Deletions by kind:".to_string());
            for (kind, count) in &self.deleted {
                lines.push(format!("  {}: {}", kind, count));
            }
            lines.push(format!("  Total: {}", self.total_deleted()));
            lines.push(String::new());
        }

        if self.store_errors > 0 || self.notification_failures > 0 || self.batch_limit_hits > 0 {
            lines.push(format!("Store errors: {}", self.store_errors));
            lines.push(format!("Notification failures: {}", self.notification_failures));
            lines.push(format!("Batch limit hits: {}", self.batch_limit_hits));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(grants: usize, device_codes: usize) -> SweepReport {
        let mut report = SweepReport::default();
        report.kinds.insert(
            RecordKind::Grants,
            KindReport {
                deleted: grants,
                batches: 2,
                ..Default::default()
            },
        );
        report.kinds.insert(
            RecordKind::DeviceCodes,
            KindReport {
                deleted: device_codes,
                batches: 1,
                ..Default::default()
            },
        );
        report.elapsed = Duration::from_millis(40);
        report
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = CleanupMetrics::new();
        assert_eq!(metrics.total_deleted(), 0);
        assert_eq!(metrics.sweep_count, 0);
    }

    #[test]
    fn test_record_sweep() {
        let mut metrics = CleanupMetrics::new();
        metrics.record_sweep(&report(7, 3));
        metrics.record_sweep(&report(1, 0));

        assert_eq!(metrics.deleted.get(&RecordKind::Grants), Some(&8));
        assert_eq!(metrics.deleted.get(&RecordKind::DeviceCodes), Some(&3));
        assert_eq!(metrics.total_deleted(), 11);
        assert_eq!(metrics.batches, 6);
        assert_eq!(metrics.sweep_count, 2);
        assert_eq!(metrics.total_runtime_ms, 80);
    }

    #[test]
    fn test_record_failures() {
        let mut sweep = report(0, 0);
        sweep.kinds.get_mut(&RecordKind::Grants).unwrap().error = Some("boom".to_string());
        sweep.kinds.get_mut(&RecordKind::Grants).unwrap().notification_failures = 2;
        sweep.kinds.get_mut(&RecordKind::DeviceCodes).unwrap().limit_reached = true;
        assert!(sweep.has_errors());
        assert_eq!(sweep.notification_failures(), 2);

        let mut metrics = CleanupMetrics::new();
        metrics.record_sweep(&sweep);
        assert_eq!(metrics.store_errors, 1);
        assert_eq!(metrics.batch_limit_hits, 1);
        assert_eq!(metrics.notification_failures, 2);
    }

    #[test]
    fn test_report_accessors() {
        let sweep = report(4, 2);
        assert_eq!(sweep.deleted(RecordKind::Grants), 4);
        assert_eq!(sweep.total_deleted(), 6);
        assert!(!sweep.has_errors());
        assert_eq!(SweepReport::default().deleted(RecordKind::Grants), 0);
    }

    #[test]
    fn test_summary() {
        let mut metrics = CleanupMetrics::new();
        metrics.record_sweep(&report(5, 2));

        let summary = metrics.summary();
        assert!(summary.contains("Sweep cycles: 1"));
        assert!(summary.contains("Total runtime: 40ms"));
        assert!(summary.contains("grants: 5"));
        assert!(summary.contains("device_codes: 2"));
        assert!(summary.contains("Total: 7"));
        assert!(!summary.contains("Store errors"));
    }
}
