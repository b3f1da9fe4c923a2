mod directory;
mod downloads;
mod lock;
mod repository;

pub use directory::MemoryDirectory;
pub use downloads::MemoryDownloadCounter;
pub use lock::{MemoryDistributedLock, MemoryLockGuard};
pub use repository::MemoryFileRepository;
