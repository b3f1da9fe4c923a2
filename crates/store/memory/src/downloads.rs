use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use dashmap::DashMap;

use zoo_core::{DownloadCounts, HourlyDownloads};
use zoo_store::downloads::DownloadCounter;
use zoo_store::error::StoreError;

#[derive(Debug, Default)]
struct FileBuckets {
    model_id: String,
    buckets: Vec<HourlyDownloads>,
}

/// In-memory [`DownloadCounter`]. Buckets are fed through
/// [`MemoryDownloadCounter::record`]; the download path that would normally
/// do so lives outside this crate.
#[derive(Debug, Default)]
pub struct MemoryDownloadCounter {
    files: DashMap<String, FileBuckets>,
}

impl MemoryDownloadCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `downloads` to the hourly bucket containing `at`.
    pub fn record(&self, file_id: &str, model_id: &str, at: DateTime<Utc>, downloads: u64) {
        let hour = at.duration_trunc(TimeDelta::hours(1)).unwrap_or(at);
        let mut entry = self.files.entry(file_id.to_owned()).or_default();
        entry.model_id = model_id.to_owned();
        match entry.buckets.iter_mut().find(|b| b.hour == hour) {
            Some(bucket) => bucket.downloads += downloads,
            None => entry.buckets.push(HourlyDownloads { hour, downloads }),
        }
    }
}

#[async_trait]
impl DownloadCounter for MemoryDownloadCounter {
    async fn counts_by_files(
        &self,
        file_ids: &[String],
    ) -> Result<HashMap<String, DownloadCounts>, StoreError> {
        let now = Utc::now();
        Ok(file_ids
            .iter()
            .filter_map(|id| {
                self.files.get(id).map(|f| {
                    (
                        id.clone(),
                        DownloadCounts::from_buckets(f.buckets.iter().copied(), now),
                    )
                })
            })
            .collect())
    }

    async fn counts_by_models(
        &self,
        model_ids: &[String],
    ) -> Result<HashMap<String, DownloadCounts>, StoreError> {
        let now = Utc::now();
        let mut counts: HashMap<String, DownloadCounts> = HashMap::new();
        for entry in &self.files {
            if !model_ids.contains(&entry.model_id) {
                continue;
            }
            let file_counts = DownloadCounts::from_buckets(entry.buckets.iter().copied(), now);
            let total = counts.entry(entry.model_id.clone()).or_default();
            *total = total.merge(file_counts);
        }
        Ok(counts)
    }
}
