//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bff_proxy_requests_total` (counter): proxied requests by upstream, kind, status
//! - `bff_proxy_request_duration_seconds` (histogram): latency by upstream, kind
//!
//! # Design Decisions
//! - Metric updates are no-ops until a recorder is installed
//! - `kind` is `local` or `remote`
//! - `upstream` is a configured name or `unknown`, never raw client input

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const REQUESTS_TOTAL: &str = "bff_proxy_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "bff_proxy_request_duration_seconds";

pub const KIND_LOCAL: &str = "local";
pub const KIND_REMOTE: &str = "remote";

/// `upstream` label for names matching no configured upstream.
pub const UNKNOWN_UPSTREAM: &str = "unknown";

/// Installs the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe();

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

fn describe() {
    describe_counter!(REQUESTS_TOTAL, "Total number of proxied requests");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Duration of proxied requests in seconds"
    );
}

pub fn record_request(upstream: &str, kind: &'static str, status: u16, start: Instant) {
    let duration = start.elapsed().as_secs_f64();

    counter!(
        REQUESTS_TOTAL,
        "upstream" => upstream.to_string(),
        "kind" => kind,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        REQUEST_DURATION_SECONDS,
        "upstream" => upstream.to_string(),
        "kind" => kind
    )
    .record(duration);
}
