pub mod directory;
pub mod downloads;
pub mod error;
pub mod lock;
pub mod repository;
pub mod testing;

pub use directory::{ModelDirectory, UserDirectory};
pub use downloads::DownloadCounter;
pub use error::StoreError;
pub use lock::{DistributedLock, LockGuard};
pub use repository::FileRepository;
