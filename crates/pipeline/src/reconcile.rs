use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use zoo_blob::{BlobError, BlobStore};
use zoo_core::{BLOB_KEY_PREFIX, File, FileStatus, blob_key_for, file_id_from_blob_key};
use zoo_store::{FileRepository, StoreError};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("blob store error: {0}")]
    Blob(#[from] BlobError),

    #[error("file repository error: {0}")]
    Store(#[from] StoreError),
}

/// What a reconciliation pass found, and what it deleted when applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub scanned_blobs: usize,
    pub scanned_files: usize,
    /// Blob keys with no committed file behind them.
    pub orphan_blobs: Vec<String>,
    /// Ids of committed files whose blob is missing. Reported only.
    pub missing_blobs: Vec<String>,
    /// Orphan blob keys removed by this pass.
    pub deleted_blobs: Vec<String>,
    /// Orphan blob keys that could not be removed.
    pub failed_deletes: Vec<String>,
}

/// Cross-checks the blob store against the file repository.
///
/// Catches the bytes left behind when a commit fails after the blob write,
/// and any committed record that lost its blob.
pub struct Reconciler {
    files: Arc<dyn FileRepository>,
    blobs: Arc<dyn BlobStore>,
    grace: Duration,
}

impl Reconciler {
    /// `grace` protects pending files of uploads still in flight.
    pub fn new(files: Arc<dyn FileRepository>, blobs: Arc<dyn BlobStore>, grace: Duration) -> Self {
        Self {
            files,
            blobs,
            grace,
        }
    }

    /// Scan both sides and, if `apply`, delete orphan blobs.
    ///
    /// # Errors
    ///
    /// Fails if either side cannot be listed. Individual delete failures are
    /// recorded in the report instead.
    pub async fn run(&self, apply: bool) -> Result<ReconcileReport, ReconcileError> {
        let keys = self.blobs.list_keys(BLOB_KEY_PREFIX).await?;
        let files = self.files.scan(None).await?;

        let mut report = ReconcileReport {
            scanned_blobs: keys.len(),
            scanned_files: files.len(),
            ..ReconcileReport::default()
        };

        let by_id: HashMap<&str, &File> = files.iter().map(|f| (f.id.as_str(), f)).collect();
        let cutoff = chrono::Duration::from_std(self.grace)
            .ok()
            .and_then(|grace| Utc::now().checked_sub_signed(grace))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        for key in &keys {
            let Some(id) = file_id_from_blob_key(key) else {
                continue;
            };
            let orphan = match by_id.get(id) {
                None => true,
                Some(file) => match file.status {
                    FileStatus::Committed => false,
                    FileStatus::Pending => file.created_time < cutoff,
                    FileStatus::Deleted => true,
                },
            };
            if orphan {
                report.orphan_blobs.push(key.clone());
            }
        }

        let present: HashSet<&str> = keys.iter().map(String::as_str).collect();
        report.missing_blobs = files
            .iter()
            .filter(|f| f.status == FileStatus::Committed)
            .filter(|f| !present.contains(blob_key_for(&f.id).as_str()))
            .map(|f| f.id.clone())
            .collect();

        for id in &report.missing_blobs {
            warn!(file_id = %id, "committed file has no blob");
        }

        if apply {
            for key in &report.orphan_blobs {
                match self.blobs.delete(key).await {
                    Ok(_) => report.deleted_blobs.push(key.clone()),
                    Err(e) => {
                        warn!(error = %e, key = %key, "could not delete orphan blob");
                        report.failed_deletes.push(key.clone());
                    }
                }
            }
        }

        info!(
            scanned_blobs = report.scanned_blobs,
            scanned_files = report.scanned_files,
            orphans = report.orphan_blobs.len(),
            missing = report.missing_blobs.len(),
            deleted = report.deleted_blobs.len(),
            apply,
            "reconciliation complete"
        );
        Ok(report)
    }
}
