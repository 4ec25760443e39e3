//! Metrics collection and exposition.
//!
//! # Metrics
//! - `secure_headers_responses_total` (counter): responses seen, by `target`
//! - `secure_headers_applied_total` (counter): headers written, by `header`
//! - `secure_headers_nonces_total` (counter): CSP nonces generated
//! - `secure_headers_plan_reloads_total` (counter): plans swapped in at runtime
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is optional and owns its own listener

use std::net::SocketAddr;

use axum::http::HeaderName;
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::plan::Target;

pub const RESPONSES_TOTAL: &str = "secure_headers_responses_total";
pub const APPLIED_TOTAL: &str = "secure_headers_applied_total";
pub const NONCES_TOTAL: &str = "secure_headers_nonces_total";
pub const PLAN_RELOADS_TOTAL: &str = "secure_headers_plan_reloads_total";

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    describe_counter!(RESPONSES_TOTAL, "Responses processed by the security headers layer");
    describe_counter!(APPLIED_TOTAL, "Security headers written to responses");
    describe_counter!(NONCES_TOTAL, "CSP nonces generated");
    describe_counter!(PLAN_RELOADS_TOTAL, "Header plans swapped in at runtime");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_response(target: Target) {
    counter!(RESPONSES_TOTAL, "target" => target.as_str()).increment(1);
}

pub fn record_header(name: &HeaderName) {
    counter!(APPLIED_TOTAL, "header" => name.as_str().to_owned()).increment(1);
}

pub fn record_nonce() {
    counter!(NONCES_TOTAL).increment(1);
}

pub fn record_plan_reload() {
    counter!(PLAN_RELOADS_TOTAL).increment(1);
}
