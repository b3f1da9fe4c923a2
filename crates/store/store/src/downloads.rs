use std::collections::HashMap;

use async_trait::async_trait;

use zoo_core::DownloadCounts;

use crate::error::StoreError;

/// Read-only aggregation of hourly download buckets.
///
/// Ids with no recorded downloads are absent from the returned map; callers
/// treat absence as zero counts.
#[async_trait]
pub trait DownloadCounter: Send + Sync {
    async fn counts_by_files(
        &self,
        file_ids: &[String],
    ) -> Result<HashMap<String, DownloadCounts>, StoreError>;

    async fn counts_by_models(
        &self,
        model_ids: &[String],
    ) -> Result<HashMap<String, DownloadCounts>, StoreError>;
}
