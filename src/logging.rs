//! Tracing setup and per-request span fields (ambient).
//!
//! The host platform's `logging::SqliteLogLayer` persists spans into a
//! `_logs` table; this subsystem has no logs table, so it keeps the same
//! `TraceLayer::make_span_with`/`on_request`/`on_response` wiring but
//! forwards to a plain `tracing_subscriber::fmt` backend instead.

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use std::time::Duration;
use tracing::Span;
use tracing_subscriber::EnvFilter;

const LEVEL: tracing::Level = tracing::Level::INFO;
const SPAN_NAME: &str = "realtime::request";

/// Installs a stderr subscriber honoring `RUST_LOG`, defaulting to `info`.
///
/// Safe to call more than once per process (e.g. once per test); failure is
/// swallowed since it only means another caller already installed one.
pub fn init() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .try_init();
}

pub(crate) fn make_span(request: &Request<Body>) -> Span {
  return tracing::span!(
    LEVEL,
    SPAN_NAME,
    method = %request.method(),
    uri = %request.uri(),
    status = tracing::field::Empty,
    latency_ms = tracing::field::Empty,
  );
}

pub(crate) fn on_request(_request: &Request<Body>, _span: &Span) {}

pub(crate) fn on_response(response: &Response<Body>, latency: Duration, span: &Span) {
  span.record("status", response.status().as_u16());
  span.record("latency_ms", as_millis_f64(&latency));
  tracing::event!(LEVEL, "response sent");
}

fn as_millis_f64(d: &Duration) -> f64 {
  const NANOS_PER_MILLI: f64 = 1_000_000.0;
  const MILLIS_PER_SEC: u64 = 1_000;

  return (d.as_secs() as f64) * (MILLIS_PER_SEC as f64)
    + (d.subsec_nanos() as f64) / NANOS_PER_MILLI;
}
