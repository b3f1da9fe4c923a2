use serde::Deserialize;

/// Configuration for the blob store holding file payloads.
#[derive(Debug, Deserialize)]
pub struct BlobConfig {
    /// Which backend to use: `"memory"`, `"fs"` or `"s3"`.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Root directory for the `fs` backend.
    pub path: Option<String>,

    /// S3 bucket name.
    pub bucket: Option<String>,

    /// Key prefix inside the bucket.
    pub prefix: Option<String>,

    /// AWS region. Defaults to `"us-east-1"`.
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible stores (`MinIO`, `LocalStack`).
    pub endpoint_url: Option<String>,

    /// Use path-style bucket addressing.
    #[serde(default)]
    pub force_path_style: bool,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
            bucket: None,
            prefix: None,
            region: None,
            endpoint_url: None,
            force_path_style: false,
        }
    }
}

fn default_backend() -> String {
    "memory".to_owned()
}
