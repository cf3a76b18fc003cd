//! Prometheus metrics for the authentication middleware.
//!
//! Metrics are exposed via a dedicated HTTP listener (default: `0.0.0.0:9090`).
//! Recording functions are safe to call when no exporter is installed; the
//! `metrics` facade simply discards the values.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `keystone_auth_requests_total` - Requests seen by the middleware (label: outcome)
//! - `keystone_auth_validation_failures_total` - Failed validations (label: kind)
//! - `keystone_auth_cache_lookups_total` - Cache lookups (label: result)
//!
//! ## Histograms
//! - `keystone_auth_validation_duration_seconds` - Identity service round trip
//!
//! ## Gauges
//! - `keystone_auth_cache_entries` - Entries held by the in-memory cache

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "keystone_auth_requests_total";
    pub const VALIDATION_FAILURES_TOTAL: &str = "keystone_auth_validation_failures_total";
    pub const CACHE_LOOKUPS_TOTAL: &str = "keystone_auth_cache_lookups_total";
    pub const VALIDATION_DURATION_SECONDS: &str = "keystone_auth_validation_duration_seconds";
    pub const CACHE_ENTRIES: &str = "keystone_auth_cache_entries";
}

/// Install the Prometheus exporter and describe all metrics.
///
/// # Errors
///
/// Returns a message if the exporter (or its HTTP listener) cannot be installed.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::REQUESTS_TOTAL,
        "Requests processed by the auth middleware, by outcome"
    );
    describe_counter!(
        names::VALIDATION_FAILURES_TOTAL,
        "Token validations that failed, by error kind"
    );
    describe_counter!(
        names::CACHE_LOOKUPS_TOTAL,
        "Token cache lookups, by hit or miss"
    );
    describe_histogram!(
        names::VALIDATION_DURATION_SECONDS,
        "Identity service validation round trip in seconds"
    );
    describe_gauge!(
        names::CACHE_ENTRIES,
        "Identities currently held by the in-memory token cache"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

/// Record the terminal state of one request through the middleware.
pub fn record_request_outcome(outcome: &'static str) {
    counter!(names::REQUESTS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_validation_failure(kind: &'static str) {
    counter!(names::VALIDATION_FAILURES_TOTAL, "kind" => kind).increment(1);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!(names::CACHE_LOOKUPS_TOTAL, "result" => result).increment(1);
}

pub fn record_validation_duration(duration_secs: f64) {
    histogram!(names::VALIDATION_DURATION_SECONDS).record(duration_secs);
}

/// Precision loss above 2^53 entries is irrelevant for a gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_cache_entries(count: usize) {
    gauge!(names::CACHE_ENTRIES).set(count as f64);
}
