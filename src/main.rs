use std::env;

use bytes::Bytes;
use heavy_endpoint::handlers::heavy::{heavy, Workload};
use heavy_endpoint::telemetry;
use http_body_util::{combinators::BoxBody, BodyExt, Empty};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, Context};
use opentelemetry_http::HeaderExtractor;
use opentelemetry_sdk::trace::SdkTracer;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const BIND_ADDRESS: &str = "0.0.0.0:8080";

// Utility function to extract the context from the incoming request headers
fn extract_context_from_request(req: &Request<Incoming>) -> Context {
    global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeaderExtractor(req.headers()))
    })
}

fn empty() -> BoxBody<Bytes, hyper::Error> {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}

async fn run_server(
    bind_address: &str,
    tracer: SdkTracer,
    workload: Workload,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_address).await?;
    info!(%bind_address, "starting server");

    loop {
        let (stream, _) = listener.accept().await?;
        let peer_addr = stream.peer_addr()?;
        let io = TokioIo::new(stream);

        let tracer = tracer.clone();
        let service = service_fn(move |req| {
            let tracer = tracer.clone();
            let parent_cx = extract_context_from_request(&req);

            async move {
                match req.uri().path() {
                    "/heavy" => {
                        Ok::<_, hyper::Error>(heavy(req, &tracer, workload, parent_cx).await)
                    }
                    _ => {
                        debug!(method = %req.method(), path = %req.uri().path(), "no route found");
                        let mut not_found = Response::new(empty());
                        *not_found.status_mut() = StatusCode::NOT_FOUND;
                        Ok(not_found)
                    }
                }
            }
        });

        tokio::task::spawn(async move {
            debug!(peer = ?peer_addr, "accepted connection");
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(error = ?err, "error serving connection");
            }
        });
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let provider = telemetry::init_tracer()?;
    let tracer = provider.tracer("main");

    let bind_address = env::var("BIND_ADDRESS").unwrap_or_else(|_| BIND_ADDRESS.to_string());

    let result = run_server(&bind_address, tracer, Workload::default()).await;
    if let Err(err) = &result {
        error!(error = ?err, "server failed");
    }

    // Buffered spans still go out when the server loop fails.
    if let Err(err) = provider.shutdown() {
        warn!(error = ?err, "trace pipeline shutdown failed");
    }

    result.map_err(Into::into)
}
