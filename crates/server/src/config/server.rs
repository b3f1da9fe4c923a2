use std::time::Duration;

use serde::Deserialize;

/// Where `zoo-server serve` listens. `--host` and `--port` win over both
/// fields.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Grace period for in-flight uploads once a shutdown signal arrives.
    pub shutdown_timeout_seconds: u64,
}

impl ServerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}
