use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use zoo_core::{File, FileStatus, Slot};
use zoo_store::error::StoreError;
use zoo_store::repository::FileRepository;

#[derive(Debug, Clone)]
struct StoredFile {
    file: File,
    /// Insertion order, used to break `created_time` ties.
    seq: u64,
}

/// In-memory [`FileRepository`] backed by [`DashMap`]s.
///
/// A second map indexes the pending file of each slot; inserting into it
/// through the entry API is what makes `create` a conditional write.
#[derive(Debug, Default)]
pub struct MemoryFileRepository {
    files: DashMap<String, StoredFile>,
    pending: DashMap<Slot, String>,
    seq: AtomicU64,
}

impl MemoryFileRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in any status.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Committed files of a slot, newest first.
    fn committed_newest_first(&self, slot: &Slot) -> Vec<StoredFile> {
        let mut files: Vec<StoredFile> = self
            .files
            .iter()
            .filter(|e| {
                let f = &e.value().file;
                f.status == FileStatus::Committed
                    && f.model_id == slot.model_id
                    && f.filename == slot.filename
            })
            .map(|e| e.value().clone())
            .collect();
        files.sort_by(|a, b| {
            b.file
                .created_time
                .cmp(&a.file.created_time)
                .then(b.seq.cmp(&a.seq))
        });
        files
    }
}

#[async_trait]
impl FileRepository for MemoryFileRepository {
    async fn create(&self, file: &File) -> Result<(), StoreError> {
        if file.status != FileStatus::Pending {
            return Err(StoreError::Backend(format!(
                "new files must be pending, got {}",
                file.status
            )));
        }
        match self.pending.entry(file.slot()) {
            Entry::Occupied(occupied) => Err(StoreError::PendingConflict(occupied.key().to_string())),
            Entry::Vacant(vacant) => {
                let seq = self.seq.fetch_add(1, Ordering::Relaxed);
                self.files.insert(
                    file.id.clone(),
                    StoredFile {
                        file: file.clone(),
                        seq,
                    },
                );
                vacant.insert(file.id.clone());
                Ok(())
            }
        }
    }

    async fn commit(&self, slot: &Slot, file_id: &str) -> Result<File, StoreError> {
        let no_pending = || StoreError::NoPendingFile {
            slot: slot.to_string(),
            file_id: file_id.to_owned(),
        };

        self.pending
            .remove_if(slot, |_, id| id == file_id)
            .ok_or_else(no_pending)?;

        let mut stored = self.files.get_mut(file_id).ok_or_else(no_pending)?;
        stored.file.status = FileStatus::Committed;
        Ok(stored.file.clone())
    }

    async fn delete_pending(&self, slot: &Slot) -> Result<Vec<File>, StoreError> {
        let Some((_, file_id)) = self.pending.remove(slot) else {
            return Ok(Vec::new());
        };
        Ok(self
            .files
            .remove(&file_id)
            .map(|(_, stored)| stored.file)
            .into_iter()
            .collect())
    }

    async fn files_beyond_retention(
        &self,
        slot: &Slot,
        keep: u32,
    ) -> Result<Vec<File>, StoreError> {
        let keep = usize::try_from(keep).unwrap_or(usize::MAX);
        let mut beyond: Vec<File> = self
            .committed_newest_first(slot)
            .into_iter()
            .skip(keep)
            .map(|s| s.file)
            .collect();
        beyond.reverse();
        Ok(beyond)
    }

    async fn delete(&self, file_id: &str) -> Result<bool, StoreError> {
        let Some(mut stored) = self.files.get_mut(file_id) else {
            return Ok(false);
        };
        match stored.file.status {
            FileStatus::Deleted => Ok(false),
            FileStatus::Pending => {
                let slot = stored.file.slot();
                stored.file.status = FileStatus::Deleted;
                drop(stored);
                self.pending.remove_if(&slot, |_, id| id == file_id);
                Ok(true)
            }
            FileStatus::Committed => {
                stored.file.status = FileStatus::Deleted;
                Ok(true)
            }
        }
    }

    async fn by_id(&self, file_id: &str) -> Result<Option<File>, StoreError> {
        Ok(self.files.get(file_id).map(|s| s.file.clone()))
    }

    async fn by_ids(&self, file_ids: &[String]) -> Result<Vec<File>, StoreError> {
        Ok(file_ids
            .iter()
            .filter_map(|id| self.files.get(id).map(|s| s.file.clone()))
            .collect())
    }

    async fn latest_by_model(&self, model_id: &str) -> Result<Vec<File>, StoreError> {
        let mut latest: std::collections::BTreeMap<String, StoredFile> =
            std::collections::BTreeMap::new();
        for entry in &self.files {
            let stored = entry.value();
            if stored.file.model_id != model_id || stored.file.status != FileStatus::Committed {
                continue;
            }
            let newer = latest.get(&stored.file.filename).is_none_or(|current| {
                (stored.file.created_time, stored.seq) > (current.file.created_time, current.seq)
            });
            if newer {
                latest.insert(stored.file.filename.clone(), stored.clone());
            }
        }
        Ok(latest.into_values().map(|s| s.file).collect())
    }

    async fn scan(&self, status: Option<FileStatus>) -> Result<Vec<File>, StoreError> {
        let mut files: Vec<StoredFile> = self
            .files
            .iter()
            .filter(|e| status.is_none_or(|s| e.value().file.status == s))
            .map(|e| e.value().clone())
            .collect();
        files.sort_by_key(|s| s.seq);
        Ok(files.into_iter().map(|s| s.file).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use zoo_core::{Metadata, Provenance};
    use zoo_store::testing::run_file_repository_conformance_tests;

    use super::*;

    fn pending(slot: &Slot) -> File {
        File::new_pending(
            "u-1",
            slot.model_id.clone(),
            slot.filename.clone(),
            Provenance::default(),
            8,
            Metadata::new(),
        )
    }

    #[tokio::test]
    async fn conformance() {
        let repo = MemoryFileRepository::new();
        run_file_repository_conformance_tests(&repo)
            .await
            .expect("file repository conformance tests should pass");
    }

    #[tokio::test]
    async fn identical_timestamps_fall_back_to_insertion_order() {
        let repo = MemoryFileRepository::new();
        let slot = Slot::new("m-1", "w.bin");
        let now = chrono::Utc::now();

        let mut ids = Vec::new();
        for _ in 0..3 {
            let mut file = pending(&slot);
            file.created_time = now;
            repo.create(&file).await.unwrap();
            repo.commit(&slot, &file.id).await.unwrap();
            ids.push(file.id);
        }

        let beyond = repo.files_beyond_retention(&slot, 1).await.unwrap();
        let beyond: Vec<_> = beyond.into_iter().map(|f| f.id).collect();
        assert_eq!(beyond, vec![ids[0].clone(), ids[1].clone()]);
    }

    #[tokio::test]
    async fn deleting_pending_frees_the_slot() {
        let repo = MemoryFileRepository::new();
        let slot = Slot::new("m-1", "w.bin");
        let file = pending(&slot);
        repo.create(&file).await.unwrap();

        assert!(repo.delete(&file.id).await.unwrap());
        repo.create(&pending(&slot)).await.unwrap();
        assert!(matches!(
            repo.commit(&slot, &file.id).await,
            Err(StoreError::NoPendingFile { .. })
        ));
    }

    #[tokio::test]
    async fn rejects_non_pending_create() {
        let repo = MemoryFileRepository::new();
        let mut file = pending(&Slot::new("m", "f"));
        file.status = FileStatus::Committed;
        assert!(matches!(
            repo.create(&file).await,
            Err(StoreError::Backend(_))
        ));
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn concurrent_creates_admit_one_pending() {
        let repo = Arc::new(MemoryFileRepository::new());
        let slot = Slot::new("m-1", "race.bin");

        let mut handles = Vec::new();
        for _ in 0..16 {
            let repo = Arc::clone(&repo);
            let file = pending(&slot);
            handles.push(tokio::spawn(async move { repo.create(&file).await }));
        }

        let mut created = 0;
        for h in handles {
            if h.await.expect("task should not panic").is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(repo.len(), 1);
    }
}
