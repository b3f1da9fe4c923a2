pub mod caller;
pub mod downloads;
pub mod file;
pub mod metadata;
pub mod model;
pub mod retention;
pub mod slot;

pub use caller::Caller;
pub use downloads::{DownloadCounts, HourlyDownloads};
pub use file::{
    BLOB_CONTENT_TYPE, BLOB_KEY_PREFIX, File, FileStatus, Provenance, blob_key_for,
    file_id_from_blob_key,
};
pub use metadata::{Metadata, MetadataError, parse_metadata};
pub use model::{Model, User};
pub use retention::{RetentionPolicy, SizeTier};
pub use slot::Slot;
