use std::time::Duration;

use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::{Request, Response, StatusCode};
use opentelemetry::trace::{Span, SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::trace::SdkTracer;
use opentelemetry_semantic_conventions::attribute::{HTTP_REQUEST_METHOD, URL_PATH};
use thiserror::Error;

/// Name of the server span wrapping each request.
pub const ROOT_SPAN_NAME: &str = "heavy-endpoint";

/// Fixed response body, newline included.
pub const RESPONSE_BODY: &str = "This is heavy endpoint\n";

/// Baseline delay burned before any sub-operation runs.
pub const PREPARE_UNITS: u32 = 2;

/// Durations handed to [`super_heavy_func`], in call order.
pub const HEAVY_FUNC_UNITS: [u32; 3] = [8, 3, 5];

/// Sub-operations running longer than this many units get their span marked
/// as failed. The marker never reaches the HTTP client.
pub const TIMEOUT_THRESHOLD_UNITS: u32 = 5;

#[derive(Debug, Error)]
enum WorkError {
    #[error("timeout!")]
    Timeout,
}

/// Simulated workload standing in for real work. The unit duration is
/// injected so tests can run with zero-delay units instead of real sleeps.
#[derive(Clone, Copy, Debug)]
pub struct Workload {
    unit: Duration,
}

impl Workload {
    pub fn new(unit: Duration) -> Self {
        Workload { unit }
    }

    /// Zero-delay stand-in for tests.
    pub fn instant() -> Self {
        Workload::new(Duration::ZERO)
    }

    async fn run(&self, units: u32) {
        tokio::time::sleep(self.unit * units).await;
    }
}

impl Default for Workload {
    /// One real second per simulated unit.
    fn default() -> Self {
        Workload::new(Duration::from_secs(1))
    }
}

/// Serves `/heavy`: opens the server root span under `parent_cx`, burns the
/// baseline delay, runs the three heavy sub-operations sequentially, and
/// always answers 200 with the fixed body. Simulated timeouts inside the
/// sub-operations are span metadata only and never change the response.
pub async fn heavy<B>(
    req: Request<B>,
    tracer: &SdkTracer,
    workload: Workload,
    parent_cx: Context,
) -> Response<BoxBody<Bytes, hyper::Error>> {
    let span = tracer
        .span_builder(ROOT_SPAN_NAME)
        .with_kind(SpanKind::Server)
        .with_attributes([
            KeyValue::new(HTTP_REQUEST_METHOD, req.method().as_str().to_string()),
            KeyValue::new(URL_PATH, req.uri().path().to_string()),
        ])
        .start_with_context(tracer, &parent_cx);
    let cx = parent_cx.with_span(span);

    workload.run(PREPARE_UNITS).await;

    for units in HEAVY_FUNC_UNITS {
        super_heavy_func(&cx, tracer, workload, units).await;
    }

    let body = Full::new(Bytes::from_static(RESPONSE_BODY.as_bytes()))
        .map_err(|never| match never {})
        .boxed();
    let response = Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(body)
        .unwrap();

    cx.span().end();
    response
}

/// Burns `units` of simulated work inside its own child span. Runs beyond
/// the threshold are recorded on the span; the caller never sees an error.
async fn super_heavy_func(parent_cx: &Context, tracer: &SdkTracer, workload: Workload, units: u32) {
    let mut span = tracer
        .span_builder(format!("Heavy func {units}"))
        .start_with_context(tracer, parent_cx);

    workload.run(units).await;

    if units > TIMEOUT_THRESHOLD_UNITS {
        let err = WorkError::Timeout;
        span.record_error(&err);
        span.set_status(Status::error(err.to_string()));
    }

    span.end();
}
