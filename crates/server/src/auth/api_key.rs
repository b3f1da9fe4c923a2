use std::collections::HashMap;

use sha2::{Digest, Sha256};

use zoo_core::Caller;

use crate::config::{ApiKeyConfig, KeyRole};

#[derive(Debug, Clone)]
struct KeyEntry {
    user_id: String,
    role: KeyRole,
}

/// Lookup from `sha256_hex(raw_key)` to the owning user id and key role.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyTable {
    keys: HashMap<String, KeyEntry>,
}

impl ApiKeyTable {
    /// Build the table from configured key hashes.
    pub fn new(configs: &[ApiKeyConfig]) -> Self {
        let keys = configs
            .iter()
            .map(|cfg| {
                let entry = KeyEntry {
                    user_id: cfg.user_id.clone(),
                    role: cfg.role,
                };
                (cfg.key_hash.to_ascii_lowercase(), entry)
            })
            .collect();
        Self { keys }
    }

    /// Add a raw key for `user_id`.
    #[must_use]
    pub fn with_key(self, raw_key: &str, user_id: impl Into<String>) -> Self {
        self.with_role(raw_key, user_id, KeyRole::Uploader)
    }

    /// Add a raw key for `user_id` with an explicit role.
    #[must_use]
    pub fn with_role(mut self, raw_key: &str, user_id: impl Into<String>, role: KeyRole) -> Self {
        let entry = KeyEntry {
            user_id: user_id.into(),
            role,
        };
        self.keys.insert(hash_api_key(raw_key), entry);
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Resolve a raw key to the caller it authenticates and the key's role.
    pub fn authenticate(&self, raw_key: &str) -> Option<(Caller, KeyRole)> {
        self.keys
            .get(&hash_api_key(raw_key))
            .map(|entry| (Caller::new(entry.user_id.clone(), "api_key"), entry.role))
    }
}

/// Hash a raw API key to the lookup format (lowercase hex SHA-256).
pub fn hash_api_key(raw_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_key.as_bytes());
    hex::encode(hasher.finalize())
}
