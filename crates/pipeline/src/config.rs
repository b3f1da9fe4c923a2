use std::time::Duration;

use zoo_core::RetentionPolicy;

/// Tunables for [`crate::UploadPipeline`].
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Plan tier table mapping `keep` to the maximum upload size.
    pub policy: RetentionPolicy,
    /// TTL of the per-slot lock. Bounds how long a crashed upload blocks
    /// its slot.
    pub lock_ttl: Duration,
    /// How long an upload waits for a busy slot before failing.
    pub lock_timeout: Duration,
    /// Pending records younger than this are treated as in flight by the
    /// reconciler.
    pub reconcile_grace: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            policy: RetentionPolicy::default(),
            lock_ttl: Duration::from_secs(120),
            lock_timeout: Duration::from_secs(10),
            reconcile_grace: Duration::from_secs(3600),
        }
    }
}
