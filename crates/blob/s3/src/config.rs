use serde::Deserialize;

/// Configuration for the S3 blob store.
#[derive(Clone, Deserialize)]
pub struct S3BlobConfig {
    /// AWS region (e.g. `"us-east-1"`).
    pub region: String,

    /// Bucket holding file payloads.
    pub bucket: String,

    /// Key prefix prepended to every blob key (e.g. `"zoo/"`).
    #[serde(default)]
    pub prefix: Option<String>,

    /// Endpoint URL override for S3-compatible stores (`MinIO`, `LocalStack`).
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Use path-style addressing (required by most S3-compatible stores).
    #[serde(default)]
    pub force_path_style: bool,
}

impl std::fmt::Debug for S3BlobConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3BlobConfig")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("endpoint_url", &self.endpoint_url)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

impl S3BlobConfig {
    /// Create a config for `bucket` in `region`.
    pub fn new(region: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            bucket: bucket.into(),
            prefix: None,
            endpoint_url: None,
            force_path_style: false,
        }
    }

    /// Set the key prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the endpoint URL override.
    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Apply the configured prefix to a blob key.
    pub(crate) fn object_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_owned(),
        }
    }

    /// Strip the configured prefix from an object key.
    pub(crate) fn blob_key<'a>(&self, object_key: &'a str) -> Option<&'a str> {
        match &self.prefix {
            Some(prefix) => object_key.strip_prefix(prefix.as_str()),
            None => Some(object_key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_applied_and_stripped() {
        let config = S3BlobConfig::new("us-east-1", "zoo-files").with_prefix("prod/");
        assert_eq!(config.object_key("files/abc"), "prod/files/abc");
        assert_eq!(config.blob_key("prod/files/abc"), Some("files/abc"));
        assert_eq!(config.blob_key("staging/files/abc"), None);
    }

    #[test]
    fn no_prefix_is_identity() {
        let config = S3BlobConfig::new("us-east-1", "zoo-files");
        assert_eq!(config.object_key("files/abc"), "files/abc");
        assert_eq!(config.blob_key("files/abc"), Some("files/abc"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: S3BlobConfig =
            serde_json::from_str(r#"{"region": "eu-west-1", "bucket": "b"}"#).unwrap();
        assert!(config.prefix.is_none());
        assert!(!config.force_path_style);
    }
}
