//! Memory-backed collaborators with switchable failures.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::Stream;

use zoo_blob::{BlobError, BlobStore};
use zoo_blob_memory::MemoryBlobStore;
use zoo_core::{Caller, DownloadCounts, File, FileStatus, Model, Slot, User};
use zoo_store::{DownloadCounter, FileRepository, StoreError};
use zoo_store_memory::{
    MemoryDirectory, MemoryDistributedLock, MemoryDownloadCounter, MemoryFileRepository,
};

use crate::config::UploadConfig;
use crate::pipeline::{UploadPipeline, UploadRequest};

#[derive(Default)]
pub struct FlakyBlobs {
    pub inner: MemoryBlobStore,
    pub fail_save: AtomicBool,
    pub fail_delete: AtomicBool,
    /// Delay applied to the next `save` only.
    pub next_save_delay_ms: AtomicU64,
}

#[async_trait]
impl BlobStore for FlakyBlobs {
    async fn save(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), BlobError> {
        let delay = self.next_save_delay_ms.swap(0, Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(BlobError::Connection("bucket unreachable".into()));
        }
        self.inner.save(key, data, content_type).await
    }

    async fn delete(&self, key: &str) -> Result<bool, BlobError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(BlobError::Storage("delete refused".into()));
        }
        self.inner.delete(key).await
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, BlobError> {
        self.inner.list_keys(prefix).await
    }
}

#[derive(Default)]
pub struct FlakyFiles {
    pub inner: MemoryFileRepository,
    pub fail_create: AtomicBool,
    pub fail_commit: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_listing: AtomicBool,
}

impl FlakyFiles {
    fn check(flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!("{what} failed")));
        }
        Ok(())
    }

    /// Committed files of a slot, oldest first.
    pub async fn committed(&self, slot: &Slot) -> Vec<File> {
        self.inner.files_beyond_retention(slot, 0).await.unwrap()
    }

    pub async fn with_status(&self, status: FileStatus) -> Vec<File> {
        self.inner.scan(Some(status)).await.unwrap()
    }
}

#[async_trait]
impl FileRepository for FlakyFiles {
    async fn create(&self, file: &File) -> Result<(), StoreError> {
        Self::check(&self.fail_create, "create")?;
        self.inner.create(file).await
    }

    async fn commit(&self, slot: &Slot, file_id: &str) -> Result<File, StoreError> {
        Self::check(&self.fail_commit, "commit")?;
        self.inner.commit(slot, file_id).await
    }

    async fn delete_pending(&self, slot: &Slot) -> Result<Vec<File>, StoreError> {
        self.inner.delete_pending(slot).await
    }

    async fn files_beyond_retention(
        &self,
        slot: &Slot,
        keep: u32,
    ) -> Result<Vec<File>, StoreError> {
        Self::check(&self.fail_listing, "listing")?;
        self.inner.files_beyond_retention(slot, keep).await
    }

    async fn delete(&self, file_id: &str) -> Result<bool, StoreError> {
        Self::check(&self.fail_delete, "delete")?;
        self.inner.delete(file_id).await
    }

    async fn by_id(&self, file_id: &str) -> Result<Option<File>, StoreError> {
        self.inner.by_id(file_id).await
    }

    async fn by_ids(&self, file_ids: &[String]) -> Result<Vec<File>, StoreError> {
        self.inner.by_ids(file_ids).await
    }

    async fn latest_by_model(&self, model_id: &str) -> Result<Vec<File>, StoreError> {
        self.inner.latest_by_model(model_id).await
    }

    async fn scan(&self, status: Option<FileStatus>) -> Result<Vec<File>, StoreError> {
        self.inner.scan(status).await
    }
}

#[derive(Default)]
pub struct FlakyCounter {
    pub inner: MemoryDownloadCounter,
    pub fail: AtomicBool,
}

#[async_trait]
impl DownloadCounter for FlakyCounter {
    async fn counts_by_files(
        &self,
        file_ids: &[String],
    ) -> Result<HashMap<String, DownloadCounts>, StoreError> {
        FlakyFiles::check(&self.fail, "counts")?;
        self.inner.counts_by_files(file_ids).await
    }

    async fn counts_by_models(
        &self,
        model_ids: &[String],
    ) -> Result<HashMap<String, DownloadCounts>, StoreError> {
        FlakyFiles::check(&self.fail, "counts")?;
        self.inner.counts_by_models(model_ids).await
    }
}

/// Owner `ada` (`u-ada`) with models `mnist` (keep 10), `big` (keep 100)
/// and `tiny` (keep 1); second user `bob` (`u-bob`) with no models.
pub struct Harness {
    pub pipeline: UploadPipeline,
    pub files: Arc<FlakyFiles>,
    pub blobs: Arc<FlakyBlobs>,
    pub counter: Arc<FlakyCounter>,
    pub lock: Arc<MemoryDistributedLock>,
}

fn model(id: &str, slug: &str, keep: u32) -> Model {
    Model {
        id: id.into(),
        user_id: "u-ada".into(),
        slug: slug.into(),
        name: slug.into(),
        description: String::new(),
        visibility: "public".into(),
        keep,
        created_time: Utc::now(),
        downloads: None,
    }
}

pub fn harness() -> Harness {
    harness_with(UploadConfig::default())
}

pub fn harness_with(config: UploadConfig) -> Harness {
    let directory = Arc::new(MemoryDirectory::new());
    for (id, username) in [("u-ada", "ada"), ("u-bob", "bob")] {
        directory.insert_user(User {
            id: id.into(),
            username: username.into(),
        });
    }
    directory.insert_model(model("m-mnist", "mnist", 10));
    directory.insert_model(model("m-big", "big", 100));
    directory.insert_model(model("m-tiny", "tiny", 1));

    let files = Arc::new(FlakyFiles::default());
    let blobs = Arc::new(FlakyBlobs::default());
    let counter = Arc::new(FlakyCounter::default());
    let lock = Arc::new(MemoryDistributedLock::new());

    let pipeline = UploadPipeline::builder()
        .files(files.clone())
        .blobs(blobs.clone())
        .users(directory.clone())
        .models(directory)
        .downloads(counter.clone())
        .lock(lock.clone())
        .config(config)
        .build()
        .expect("pipeline should build");

    Harness {
        pipeline,
        files,
        blobs,
        counter,
        lock,
    }
}

pub fn ada() -> Caller {
    Caller::new("u-ada", "api_key")
}

pub fn request(slug: &str, filename: &str) -> UploadRequest {
    UploadRequest {
        username: "ada".into(),
        slug: slug.into(),
        framework: "keras".into(),
        filename: filename.into(),
        framework_version: "2.1.0".into(),
        client_name: "zoo-python".into(),
        metadata: Some(r#"{"epoch": 1}"#.into()),
    }
}

pub fn body(data: &[u8]) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + use<> {
    futures::stream::iter(vec![Ok(Bytes::copy_from_slice(data))])
}
