//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, outcome
//! - `proxy_request_duration_seconds` (histogram): time to response head
//! - `proxy_upstream_errors_total` (counter): failed exchanges by error kind
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::StatusCode;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// How a request left the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Relayed,
    Redirect,
    NotModified,
    /// Outside the mount path; never forwarded.
    NotMounted,
    Error,
}

impl Outcome {
    /// Classify a successfully produced response. Origin 300..=303 are always
    /// turned into 302, so a 302 leaving the proxy is a rewritten redirect.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::FOUND => Outcome::Redirect,
            StatusCode::NOT_MODIFIED => Outcome::NotModified,
            _ => Outcome::Relayed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Relayed => "relayed",
            Outcome::Redirect => "redirect",
            Outcome::NotModified => "not_modified",
            Outcome::NotMounted => "not_mounted",
            Outcome::Error => "error",
        }
    }
}

/// Install the Prometheus recorder and its scrape listener on `addr`.
/// Must run inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!("proxy_requests_total", "Requests handled by the proxy");
    describe_histogram!(
        "proxy_request_duration_seconds",
        "Time from request arrival to response head"
    );
    describe_counter!("proxy_upstream_errors_total", "Failed origin exchanges");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, outcome: Outcome, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error(kind: &'static str) {
    counter!("proxy_upstream_errors_total", "kind" => kind).increment(1);
}
