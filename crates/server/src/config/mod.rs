mod auth;
mod blob;
mod fixtures;
mod server;
mod store;
mod telemetry;
mod upload;


pub use auth::*;
pub use blob::*;
pub use fixtures::*;
pub use server::*;
pub use store::*;
pub use telemetry::*;
pub use upload::*;

use serde::Deserialize;

/// Top-level configuration for the zoo server, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct ZooConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// File repository, directory, download counter and lock backend.
    #[serde(default)]
    pub store: StoreConfig,
    /// Blob store backend for file payloads.
    #[serde(default)]
    pub blob: BlobConfig,
    /// Upload pipeline tunables.
    #[serde(default)]
    pub upload: UploadSettings,
    /// API keys accepted on protected routes.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Users and models seeded into the memory backend.
    #[serde(default)]
    pub fixtures: FixturesConfig,
    /// OpenTelemetry distributed tracing configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
