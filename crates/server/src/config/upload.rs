use std::time::Duration;

use serde::Deserialize;

use zoo_core::{RetentionPolicy, SizeTier};
use zoo_pipeline::UploadConfig;

/// Upload pipeline tunables.
///
/// # Example
///
/// ```toml
/// [upload]
/// lock_ttl_seconds = 120
/// lock_timeout_seconds = 10
///
/// [[upload.tiers]]
/// keep = 10
/// max_bytes = 524288000
/// ```
#[derive(Debug, Deserialize)]
pub struct UploadSettings {
    /// TTL of the per-slot upload lock.
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_seconds: u64,
    /// How long an upload waits for a busy slot.
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_seconds: u64,
    /// Age below which pending files are left alone by reconciliation.
    #[serde(default = "default_reconcile_grace")]
    pub reconcile_grace_seconds: u64,
    /// Override of the plan tier table. Empty keeps the built-in table.
    #[serde(default)]
    pub tiers: Vec<SizeTier>,
    /// Limit for `keep` values with no tier. Only used with `tiers`.
    pub default_max_bytes: Option<u64>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            lock_ttl_seconds: default_lock_ttl(),
            lock_timeout_seconds: default_lock_timeout(),
            reconcile_grace_seconds: default_reconcile_grace(),
            tiers: Vec::new(),
            default_max_bytes: None,
        }
    }
}

impl UploadSettings {
    /// Build the pipeline config.
    pub fn to_upload_config(&self) -> UploadConfig {
        let policy = if self.tiers.is_empty() {
            RetentionPolicy::default()
        } else {
            RetentionPolicy::new(
                self.tiers.clone(),
                self.default_max_bytes
                    .unwrap_or(zoo_core::retention::DEFAULT_MAX_BYTES),
            )
        };
        UploadConfig {
            policy,
            lock_ttl: Duration::from_secs(self.lock_ttl_seconds),
            lock_timeout: Duration::from_secs(self.lock_timeout_seconds),
            reconcile_grace: Duration::from_secs(self.reconcile_grace_seconds),
        }
    }
}

fn default_lock_ttl() -> u64 {
    120
}

fn default_lock_timeout() -> u64 {
    10
}

fn default_reconcile_grace() -> u64 {
    3600
}
