//! Tracing subscriber setup with an optional OTLP exporter.

use std::time::Duration;

use opentelemetry::trace::TracerProvider;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{BatchSpanProcessor, Sampler, SdkTracerProvider};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{OtlpProtocol, TelemetryConfig};

/// Handle returned by [`init`]. Call [`TelemetryGuard::shutdown`] to flush
/// pending spans before exit.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    pub fn shutdown(mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            tracing::warn!(error = %e, "OpenTelemetry tracer provider shutdown failed");
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a plain `fmt` subscriber. Used by the one-shot CLI commands.
pub fn init_fmt() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Install the tracing subscriber.
///
/// With telemetry disabled only the `fmt` layer is installed. An exporter
/// that fails to build is logged and the server keeps running with
/// fmt-only tracing.
pub fn init(config: &TelemetryConfig) -> TelemetryGuard {
    if !config.enabled {
        init_fmt();
        return TelemetryGuard { provider: None };
    }

    global::set_text_map_propagator(opentelemetry_sdk::propagation::TraceContextPropagator::new());

    let exporter = match build_exporter(config) {
        Ok(exporter) => exporter,
        Err(e) => {
            init_fmt();
            tracing::error!(
                error = %e,
                endpoint = %config.endpoint,
                protocol = ?config.protocol,
                "failed to build OTLP exporter, falling back to fmt-only tracing"
            );
            return TelemetryGuard { provider: None };
        }
    };

    let attributes = [
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ];

    let provider = SdkTracerProvider::builder()
        .with_span_processor(BatchSpanProcessor::builder(exporter).build())
        .with_sampler(sampler(config.sample_ratio))
        .with_resource(Resource::builder().with_attributes(attributes).build())
        .build();
    global::set_tracer_provider(provider.clone());

    let otel_layer = tracing_opentelemetry::layer().with_tracer(provider.tracer("zoo"));
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .init();

    info!(
        endpoint = %config.endpoint,
        protocol = ?config.protocol,
        sample_ratio = config.sample_ratio,
        "OpenTelemetry tracing enabled"
    );

    TelemetryGuard {
        provider: Some(provider),
    }
}

fn sampler(ratio: f64) -> Sampler {
    if ratio >= 1.0 {
        Sampler::AlwaysOn
    } else if ratio <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(ratio)
    }
}

fn build_exporter(
    config: &TelemetryConfig,
) -> Result<opentelemetry_otlp::SpanExporter, opentelemetry::trace::TraceError> {
    let timeout = Duration::from_secs(config.timeout_seconds);
    match config.protocol {
        OtlpProtocol::Http => opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(&config.endpoint)
            .with_timeout(timeout)
            .build(),
        OtlpProtocol::Grpc => opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&config.endpoint)
            .with_timeout(timeout)
            .build(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampler_bounds() {
        assert!(matches!(sampler(1.0), Sampler::AlwaysOn));
        assert!(matches!(sampler(0.0), Sampler::AlwaysOff));
        assert!(matches!(sampler(0.25), Sampler::TraceIdRatioBased(_)));
    }
}
