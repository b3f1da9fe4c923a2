use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::downloads::DownloadCounts;
use crate::metadata::Metadata;
use crate::slot::Slot;

/// Prefix under which file payloads are stored in the blob store.
pub const BLOB_KEY_PREFIX: &str = "files/";

/// Content type used for every stored payload.
pub const BLOB_CONTENT_TYPE: &str = "application/octet-stream";

/// Derive the blob key for a file id.
#[must_use]
pub fn blob_key_for(file_id: &str) -> String {
    format!("{BLOB_KEY_PREFIX}{file_id}")
}

/// Recover the file id from a blob key produced by [`blob_key_for`].
///
/// Returns `None` for keys outside the file namespace.
#[must_use]
pub fn file_id_from_blob_key(key: &str) -> Option<&str> {
    key.strip_prefix(BLOB_KEY_PREFIX).filter(|id| !id.is_empty())
}

/// Lifecycle position of a [`File`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum FileStatus {
    /// Created, bytes not yet confirmed stored.
    Pending,
    /// Bytes durably stored; visible to readers.
    Committed,
    /// Removed by the retention sweep.
    Deleted,
}

impl FileStatus {
    /// Return the storage representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Committed => "committed",
            Self::Deleted => "deleted",
        }
    }

    /// Parse a stored status string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "committed" => Some(Self::Committed),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-supplied provenance of an upload. Stored verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub framework: String,
    pub framework_version: String,
    pub client_name: String,
}

/// One stored version of a model file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct File {
    /// Globally unique id, generated at creation (UUID v7).
    pub id: String,
    /// User that uploaded the file.
    pub user_id: String,
    /// Model the file belongs to.
    pub model_id: String,
    /// Logical slot name shared by every version of this file.
    pub filename: String,
    pub framework: String,
    pub framework_version: String,
    pub client_name: String,
    /// Payload size in bytes.
    pub size: u64,
    /// Opaque metadata, immutable after creation.
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub metadata: Metadata,
    pub status: FileStatus,
    pub created_time: DateTime<Utc>,
    /// Download counters, filled in by hydration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<DownloadCounts>,
}

impl File {
    /// Build a new `Pending` file with a fresh id and the current time.
    pub fn new_pending(
        user_id: impl Into<String>,
        model_id: impl Into<String>,
        filename: impl Into<String>,
        provenance: Provenance,
        size: u64,
        metadata: Metadata,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            user_id: user_id.into(),
            model_id: model_id.into(),
            filename: filename.into(),
            framework: provenance.framework,
            framework_version: provenance.framework_version,
            client_name: provenance.client_name,
            size,
            metadata,
            status: FileStatus::Pending,
            created_time: Utc::now(),
            downloads: None,
        }
    }

    /// Key under which this file's bytes live in the blob store.
    #[must_use]
    pub fn blob_key(&self) -> String {
        blob_key_for(&self.id)
    }

    /// The slot this file belongs to.
    #[must_use]
    pub fn slot(&self) -> Slot {
        Slot::new(self.model_id.clone(), self.filename.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provenance() -> Provenance {
        Provenance {
            framework: "keras".into(),
            framework_version: "2.1.0".into(),
            client_name: "zoo-python".into(),
        }
    }

    #[test]
    fn new_pending_defaults() {
        let f = File::new_pending("u-1", "m-1", "weights.h5", provenance(), 42, Metadata::new());
        assert_eq!(f.status, FileStatus::Pending);
        assert_eq!(f.size, 42);
        assert_eq!(f.framework, "keras");
        assert!(f.downloads.is_none());
        assert_eq!(f.slot(), Slot::new("m-1", "weights.h5"));
    }

    #[test]
    fn ids_are_unique() {
        let a = File::new_pending("u", "m", "f", provenance(), 1, Metadata::new());
        let b = File::new_pending("u", "m", "f", provenance(), 1, Metadata::new());
        assert_ne!(a.id, b.id);
        assert_ne!(a.blob_key(), b.blob_key());
    }

    #[test]
    fn blob_key_roundtrip() {
        let f = File::new_pending("u", "m", "f", provenance(), 1, Metadata::new());
        let key = f.blob_key();
        assert!(key.starts_with(BLOB_KEY_PREFIX));
        assert_eq!(file_id_from_blob_key(&key), Some(f.id.as_str()));
        assert_eq!(file_id_from_blob_key("other/abc"), None);
        assert_eq!(file_id_from_blob_key("files/"), None);
    }

    #[test]
    fn status_strings() {
        for status in [FileStatus::Pending, FileStatus::Committed, FileStatus::Deleted] {
            assert_eq!(FileStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(FileStatus::parse("unknown"), None);
    }

    #[test]
    fn json_omits_missing_downloads() {
        let f = File::new_pending("u", "m", "f", provenance(), 1, Metadata::new());
        let json = serde_json::to_value(&f).unwrap();
        assert!(json.get("downloads").is_none());
        assert_eq!(json["status"], "pending");
        assert_eq!(json["client_name"], "zoo-python");
    }
}
