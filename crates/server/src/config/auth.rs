use serde::Deserialize;

/// API keys accepted as `Authorization: Bearer <key>`.
#[derive(Debug, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub api_keys: Vec<ApiKeyConfig>,
}

/// One API key, stored as the lowercase hex SHA-256 of the raw key.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyConfig {
    /// User the key authenticates as.
    pub user_id: String,
    pub key_hash: String,
    #[serde(default)]
    pub role: KeyRole,
}

/// What a key may do beyond uploading to its user's own models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyRole {
    #[default]
    Uploader,
    /// May also apply storage reconciliation.
    Admin,
}
