//! Prometheus metrics for the mail dispatch core.
//!
//! Counters cover the dispatch pipeline (outcomes, retries) and the
//! outcome log store (appends, append failures), plus a dispatch
//! duration histogram.

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec, TextEncoder,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "mailroom";

lazy_static! {
    /// Dispatch outcomes by status (sent, failed, cancelled, unconfirmed)
    pub static ref DISPATCHES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_dispatches_total", METRIC_PREFIX),
        "Completed dispatch calls by outcome status",
        &["status"]
    ).unwrap();

    /// Transport retries performed after a transient failure
    pub static ref DISPATCH_RETRIES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_dispatch_retries_total", METRIC_PREFIX),
        "Transport retries performed after transient failures"
    ).unwrap();

    /// End-to-end dispatch duration (compose through log append)
    pub static ref DISPATCH_DURATION_SECONDS: Histogram = register_histogram!(
        format!("{}_dispatch_duration_seconds", METRIC_PREFIX),
        "End-to-end dispatch duration in seconds",
        vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0]
    ).unwrap();

    /// Outcome log rows appended
    pub static ref LOG_APPENDS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_log_appends_total", METRIC_PREFIX),
        "Outcome log rows appended"
    ).unwrap();

    /// Outcome log appends that failed (dispatch reported as unconfirmed)
    pub static ref LOG_APPEND_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_log_append_failures_total", METRIC_PREFIX),
        "Outcome log appends that failed"
    ).unwrap();
}

/// Helpers for recording dispatch pipeline metrics.
pub struct DispatchMetrics;

impl DispatchMetrics {
    pub fn record_outcome(status: &str) {
        DISPATCHES_TOTAL.with_label_values(&[status]).inc();
    }

    pub fn record_retry() {
        DISPATCH_RETRIES_TOTAL.inc();
    }

    pub fn record_duration(seconds: f64) {
        DISPATCH_DURATION_SECONDS.observe(seconds);
    }
}

/// Encode all registered metrics in the Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode_to_string(&metric_families)
}
