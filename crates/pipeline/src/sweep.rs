use tracing::{info, warn};

use zoo_core::Slot;

use crate::context::Stores;
use crate::error::CleanupFailure;
use crate::metrics::UploadMetrics;

/// Result of one retention sweep over a slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Ids of files whose blob and record were both deleted.
    pub deleted: Vec<String>,
    pub failures: Vec<CleanupFailure>,
}

/// Delete committed files in `slot` beyond the `keep` newest.
///
/// Candidates are processed oldest first. For each one the blob goes before
/// the record, and a failed blob delete leaves the record in place so a later
/// sweep retries it. Nothing here is fatal.
pub(crate) async fn sweep_slot(
    stores: &Stores,
    metrics: &UploadMetrics,
    slot: &Slot,
    keep: u32,
) -> SweepReport {
    let mut report = SweepReport::default();

    let candidates = match stores.files.files_beyond_retention(slot, keep).await {
        Ok(files) => files,
        Err(e) => {
            warn!(error = %e, slot = %slot, "Could not delete old files");
            metrics.increment_sweep_errors();
            report.failures.push(CleanupFailure::SweepListing {
                error: e.to_string(),
            });
            return report;
        }
    };

    for file in candidates {
        if let Err(e) = stores.blobs.delete(&file.blob_key()).await {
            warn!(error = %e, old_file_id = %file.id, "Could not delete old file from blob storage");
            metrics.increment_sweep_errors();
            report.failures.push(CleanupFailure::SweepBlob {
                file_id: file.id,
                error: e.to_string(),
            });
            continue;
        }

        if let Err(e) = stores.files.delete(&file.id).await {
            warn!(error = %e, old_file_id = %file.id, "Could not delete old file object");
            metrics.increment_sweep_errors();
            report.failures.push(CleanupFailure::SweepRecord {
                file_id: file.id,
                error: e.to_string(),
            });
            continue;
        }

        metrics.increment_files_swept();
        report.deleted.push(file.id);
    }

    if !report.deleted.is_empty() || !report.failures.is_empty() {
        info!(
            slot = %slot,
            deleted = report.deleted.len(),
            errors = report.failures.len(),
            "retention sweep complete"
        );
    }
    report
}
