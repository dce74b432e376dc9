//! Prometheus metrics for consultation-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec, TextEncoder,
};

/// Inbound messages by handler branch (empty, greeting, history, symptoms).
pub static MESSAGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "consultation_messages_total",
        "Total number of inbound messages handled",
        &["branch"]
    )
    .expect("Failed to register messages_total")
});

/// Diagnoses by label. Labels come from a fixed set, so cardinality is bounded.
pub static DIAGNOSES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "consultation_diagnoses_total",
        "Total number of diagnoses produced",
        &["label"]
    )
    .expect("Failed to register diagnoses_total")
});

/// Remote diagnosis failures by kind.
pub static REMOTE_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "consultation_remote_errors_total",
        "Total number of remote diagnosis failures",
        &["kind"]
    )
    .expect("Failed to register remote_errors_total")
});

/// Store operation duration.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "consultation_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Store failures by operation.
pub static DB_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "consultation_db_errors_total",
        "Total number of database errors",
        &["operation"]
    )
    .expect("Failed to register db_errors_total")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&MESSAGES_TOTAL);
    Lazy::force(&DIAGNOSES_TOTAL);
    Lazy::force(&REMOTE_ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&DB_ERRORS_TOTAL);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to encode metrics");
            String::new()
        })
}
