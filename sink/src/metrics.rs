//! Prometheus metrics for the audit pipeline

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram_vec, Counter,
    CounterVec, Encoder, Gauge, HistogramVec, TextEncoder,
};

// ── Record building ──────────────────────────────────────────────────────────

pub static RECORDS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "oplog_records_total",
        "Audit records built, by outcome of the audited call",
        &["status"]
    )
    .unwrap()
});

pub static RECORDS_SKIPPED: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "oplog_records_skipped_total",
        "Descriptors whose condition suppressed the record"
    )
    .unwrap()
});

pub static BUILD_ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "oplog_build_errors_total",
        "Record builds that failed",
        &["kind"]
    )
    .unwrap()
});

// ── Publishing ───────────────────────────────────────────────────────────────

pub static PUBLISH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "oplog_publish_total",
        "Publish calls",
        &["status"]
    )
    .unwrap()
});

pub static HANDLER_FAILURES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "oplog_handler_failures_total",
        "Batches a handler failed to accept",
        &["handler"]
    )
    .unwrap()
});

pub static HANDLER_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "oplog_handler_duration_seconds",
        "Time spent by a handler on one batch",
        &["handler"],
        vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]
    )
    .unwrap()
});

// ── In-memory handler ────────────────────────────────────────────────────────

pub static BUFFER_SIZE: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "oplog_buffer_records",
        "Current number of records in the in-memory handler"
    )
    .unwrap()
});

pub static BUFFER_DROPS: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "oplog_buffer_drops_total",
        "Records evicted from the in-memory handler due to capacity"
    )
    .unwrap()
});

/// Render all registered metrics to Prometheus text format.
pub fn encode_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&families, &mut buffer)
        .map_err(|e| e.to_string())?;
    String::from_utf8(buffer).map_err(|e| e.to_string())
}
