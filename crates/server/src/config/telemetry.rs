use serde::Deserialize;

/// OTLP export of the upload spans. With export off the spans still reach
/// the `fmt` log.
///
/// ```toml
/// [telemetry]
/// enabled = true
/// endpoint = "http://collector:4318"
/// protocol = "http"
/// ```
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub endpoint: String,
    /// Reported as `service.name`.
    pub service_name: String,
    /// Fraction of upload traces kept.
    pub sample_ratio: f64,
    pub protocol: OtlpProtocol,
    pub timeout_seconds: u64,
}

/// Transport used to reach the collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtlpProtocol {
    #[default]
    Grpc,
    Http,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://localhost:4317".to_owned(),
            service_name: "zoo".to_owned(),
            sample_ratio: 1.0,
            protocol: OtlpProtocol::Grpc,
            timeout_seconds: 10,
        }
    }
}
