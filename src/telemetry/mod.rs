//! Trace pipeline wiring: an OTLP/HTTP exporter pointed at Mackerel plus
//! the batching tracer provider installed for the whole process.

pub mod resource;


use std::collections::HashMap;

use opentelemetry::global;
use opentelemetry_otlp::{
    Compression, ExporterBuildError, Protocol, SpanExporter, WithExportConfig, WithHttpConfig,
};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use thiserror::Error;

use self::resource::build_resource;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to build OTLP span exporter: {0}")]
    ExporterBuild(#[from] ExporterBuildError),
}

/// Mackerel's OTLP collector. The exporter appends the `/v1/traces` path.
pub const OTLP_ENDPOINT: &str = "https://otlp-vaxila.mackerelio.com";

/// Environment variable holding the Mackerel API key.
pub const API_KEY_ENV: &str = "MACKEREL_APIKEY";

/// Builds the OTLP/HTTP span exporter. The API key is read from
/// [`API_KEY_ENV`] once, here; a missing key still yields a working
/// exporter, the collector just rejects its uploads.
pub fn build_span_exporter(endpoint: &str) -> Result<SpanExporter, ExporterBuildError> {
    let api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
    let headers = HashMap::from([
        ("Accept".to_string(), "*/*".to_string()),
        ("Mackerel-Api-Key".to_string(), api_key),
    ]);

    SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .with_protocol(Protocol::HttpBinary)
        .with_headers(headers)
        .with_compression(Compression::Gzip)
        .build()
}

/// Installs the batching tracer provider process-wide and returns it. The
/// caller keeps the handle so the pipeline can be flushed and shut down on
/// exit.
pub fn init_tracer() -> Result<SdkTracerProvider, TelemetryError> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let exporter = build_span_exporter(OTLP_ENDPOINT)?;
    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(build_resource())
        .build();

    global::set_tracer_provider(provider.clone());
    Ok(provider)
}
