//! Prometheus metrics for the mediator.
//!
//! Tracks verdicts sent, internal errors by kind, and time spent walking handlers.
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::time::Duration;

lazy_static! {
    /// Verdicts sent back over reply channels
    pub static ref VERDICTS_TOTAL: CounterVec = register_counter_vec!(
        "mock_mediator_verdicts_total",
        "Total number of verdicts sent to the interception layer",
        &["verdict"]  // MOCK_SUCCESS|MOCK_NOT_FOUND|INTERNAL_ERROR
    )
    .unwrap();

    /// Failures converted into INTERNAL_ERROR verdicts
    pub static ref INTERNAL_ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "mock_mediator_internal_errors_total",
        "Total number of failures caught at the mediator boundary",
        &["error_type"]
    )
    .unwrap();

    /// Time spent resolving a request against the handler list
    pub static ref RESOLUTION_DURATION_MS: HistogramVec = register_histogram_vec!(
        "mock_mediator_resolution_duration_ms",
        "Histogram of handler resolution time in milliseconds",
        &["result"],  // result: matched|unhandled|error
        vec![0.1, 0.5, 1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0]
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

pub fn record_verdict(verdict: &str) {
    VERDICTS_TOTAL.with_label_values(&[verdict]).inc();
}

pub fn record_internal_error(error_type: &str) {
    INTERNAL_ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

pub fn record_resolution_duration(result: &str, elapsed: Duration) {
    RESOLUTION_DURATION_MS
        .with_label_values(&[result])
        .observe(elapsed.as_secs_f64() * 1000.0);
}
