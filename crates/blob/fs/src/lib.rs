//! Filesystem-backed blob store.
//!
//! Each key maps to a file under the configured root directory; `/` in a key
//! becomes a directory separator. Writes go to a temporary sibling first and
//! are renamed into place, so a crashed write never leaves a truncated
//! payload under the final key.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use zoo_blob::{BlobError, BlobStore};

/// Suffix of in-flight temporary files. Never reported by `list_keys`.
const TEMP_SUFFIX: &str = ".part";

/// [`BlobStore`] that keeps payloads as files under a root directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BlobError> {
        if key.is_empty() || key.ends_with(TEMP_SUFFIX) {
            return Err(BlobError::InvalidKey(key.to_owned()));
        }
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(BlobError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(relative))
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }
}

fn storage_err(context: &str, path: &Path, e: &std::io::Error) -> BlobError {
    BlobError::Storage(format!("{context}({}): {e}", path.display()))
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn save(&self, key: &str, data: Bytes, _content_type: &str) -> Result<(), BlobError> {
        let path = self.path_for(key)?;
        debug!(key = %key, path = %path.display(), size = data.len(), "fs blob: write");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_err("create_dir_all", parent, &e))?;
        }

        let temp_path = path.with_file_name(format!(
            "{}.{}{TEMP_SUFFIX}",
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("blob"),
            uuid::Uuid::new_v4().simple()
        ));

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| storage_err("create", &temp_path, &e))?;
        if let Err(e) = file.write_all(&data).await {
            drop(file);
            let _ = fs::remove_file(&temp_path).await;
            return Err(storage_err("write_all", &temp_path, &e));
        }
        file.sync_all()
            .await
            .map_err(|e| storage_err("sync_all", &temp_path, &e))?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &path).await {
            warn!(from = %temp_path.display(), to = %path.display(), error = %e, "fs blob: rename failed");
            let _ = fs::remove_file(&temp_path).await;
            return Err(storage_err("rename", &path, &e));
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, BlobError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(storage_err("remove_file", &path, &e)),
        }
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, BlobError> {
        let mut keys = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(storage_err("read_dir", &dir, &e)),
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| storage_err("next_entry", &dir, &e))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| storage_err("file_type", &path, &e))?;
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if let Some(key) = self.key_for(&path)
                    && !key.ends_with(TEMP_SUFFIX)
                    && key.starts_with(prefix)
                {
                    keys.push(key);
                }
            }
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use zoo_blob::testing::run_blob_conformance_tests;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        run_blob_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test]
    async fn writes_payload_to_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        store
            .save("files/abc", Bytes::from_static(b"payload"), "application/octet-stream")
            .await
            .unwrap();
        let written = std::fs::read(dir.path().join("files").join("abc")).unwrap();
        assert_eq!(written, b"payload");
    }

    #[tokio::test]
    async fn rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        for key in ["", "../etc/passwd", "/abs", "files/../../x", "files/a.part"] {
            let err = store
                .save(key, Bytes::from_static(b"x"), "application/octet-stream")
                .await
                .unwrap_err();
            assert!(matches!(err, BlobError::InvalidKey(_)), "key {key:?}");
        }
    }

    #[tokio::test]
    async fn list_on_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("not-created"));
        assert!(store.list_keys("").await.unwrap().is_empty());
    }
}
