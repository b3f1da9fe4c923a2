use async_trait::async_trait;

use zoo_core::{File, FileStatus, Slot};

use crate::error::StoreError;

/// Persistence for [`File`] records across the `Pending -> Committed ->
/// Deleted` lifecycle.
///
/// Within a slot, files are ordered by `created_time` descending with
/// insertion order as the tiebreaker.
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Persist a new `Pending` file.
    ///
    /// Fails with [`StoreError::PendingConflict`] if the slot already has a
    /// pending file.
    async fn create(&self, file: &File) -> Result<(), StoreError>;

    /// Atomically flip the pending file `file_id` in `slot` to `Committed`
    /// and return the committed record.
    ///
    /// Fails with [`StoreError::NoPendingFile`] if no such pending file
    /// exists.
    async fn commit(&self, slot: &Slot, file_id: &str) -> Result<File, StoreError>;

    /// Remove any pending file for `slot`, returning what was removed.
    /// An empty result means there was nothing to do.
    async fn delete_pending(&self, slot: &Slot) -> Result<Vec<File>, StoreError>;

    /// Committed files in `slot` beyond the `keep` most recent, oldest first.
    async fn files_beyond_retention(&self, slot: &Slot, keep: u32)
    -> Result<Vec<File>, StoreError>;

    /// Mark a file `Deleted`. Returns `false` if it was missing or already
    /// deleted.
    async fn delete(&self, file_id: &str) -> Result<bool, StoreError>;

    /// Fetch one file by id, in any status.
    async fn by_id(&self, file_id: &str) -> Result<Option<File>, StoreError>;

    /// Fetch several files by id, in input order. Missing ids are skipped.
    async fn by_ids(&self, file_ids: &[String]) -> Result<Vec<File>, StoreError>;

    /// The newest committed file for each filename of a model, sorted by
    /// filename.
    async fn latest_by_model(&self, model_id: &str) -> Result<Vec<File>, StoreError>;

    /// Every file, optionally restricted to one status.
    async fn scan(&self, status: Option<FileStatus>) -> Result<Vec<File>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_dyn_file_repository(_: &dyn FileRepository) {}
}
