//! heavy-endpoint: a demo HTTP service that simulates a slow request path
//! and exports the resulting trace to Mackerel's OTLP collector.

pub mod handlers;
pub mod telemetry;
