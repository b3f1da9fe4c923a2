use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters tracking upload outcomes.
///
/// All counters use relaxed ordering. For a point-in-time view, call
/// [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct UploadMetrics {
    /// Uploads that entered the pipeline.
    pub uploads_started: AtomicU64,
    /// Uploads whose file was committed.
    pub uploads_committed: AtomicU64,
    /// Uploads refused for validation, lookup or ownership reasons.
    pub uploads_rejected: AtomicU64,
    /// Uploads that failed on a storage or lock error.
    pub uploads_failed: AtomicU64,
    /// Payload bytes of committed uploads.
    pub bytes_committed: AtomicU64,
    /// Stale pending records removed before staging.
    pub stale_pending_removed: AtomicU64,
    /// Old versions deleted by the retention sweep.
    pub files_swept: AtomicU64,
    /// Per-item sweep failures.
    pub sweep_errors: AtomicU64,
    /// Failed download-count hydrations.
    pub hydrate_errors: AtomicU64,
}

impl UploadMetrics {
    pub fn increment_started(&self) {
        self.uploads_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejected(&self) {
        self.uploads_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed(&self) {
        self.uploads_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a committed upload of `bytes` bytes.
    pub fn record_committed(&self, bytes: u64) {
        self.uploads_committed.fetch_add(1, Ordering::Relaxed);
        self.bytes_committed.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_stale_pending_removed(&self, n: u64) {
        self.stale_pending_removed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn increment_files_swept(&self) {
        self.files_swept.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sweep_errors(&self) {
        self.sweep_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_hydrate_errors(&self) {
        self.hydrate_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uploads_started: self.uploads_started.load(Ordering::Relaxed),
            uploads_committed: self.uploads_committed.load(Ordering::Relaxed),
            uploads_rejected: self.uploads_rejected.load(Ordering::Relaxed),
            uploads_failed: self.uploads_failed.load(Ordering::Relaxed),
            bytes_committed: self.bytes_committed.load(Ordering::Relaxed),
            stale_pending_removed: self.stale_pending_removed.load(Ordering::Relaxed),
            files_swept: self.files_swept.load(Ordering::Relaxed),
            sweep_errors: self.sweep_errors.load(Ordering::Relaxed),
            hydrate_errors: self.hydrate_errors.load(Ordering::Relaxed),
        }
    }
}

/// A plain data snapshot of [`UploadMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub uploads_started: u64,
    pub uploads_committed: u64,
    pub uploads_rejected: u64,
    pub uploads_failed: u64,
    pub bytes_committed: u64,
    pub stale_pending_removed: u64,
    pub files_swept: u64,
    pub sweep_errors: u64,
    pub hydrate_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let m = UploadMetrics::default();
        m.increment_started();
        m.increment_started();
        m.record_committed(1024);
        m.increment_rejected();
        m.add_stale_pending_removed(2);
        m.increment_files_swept();

        let snap = m.snapshot();
        assert_eq!(snap.uploads_started, 2);
        assert_eq!(snap.uploads_committed, 1);
        assert_eq!(snap.bytes_committed, 1024);
        assert_eq!(snap.uploads_rejected, 1);
        assert_eq!(snap.stale_pending_removed, 2);
        assert_eq!(snap.files_swept, 1);
        assert_eq!(snap.uploads_failed, 0);
    }
}
