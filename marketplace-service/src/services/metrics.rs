//! Prometheus metrics for the marketplace service.

use once_cell::sync::Lazy;
use prometheus::{
    CounterVec, HistogramVec, TextEncoder, register_counter_vec, register_histogram_vec,
};

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "marketplace_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Order counter by outcome.
pub static ORDERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "marketplace_orders_total",
        "Total number of order operations by outcome",
        &["outcome"] // placed, cancelled, rejected
    )
    .expect("Failed to register orders_total")
});

/// Stock rejections (insufficient stock at placement time).
pub static STOCK_REJECTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "marketplace_stock_rejections_total",
        "Order lines rejected for insufficient stock",
        &["stage"] // assembly, decrement
    )
    .expect("Failed to register stock_rejections_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "marketplace_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&ORDERS_TOTAL);
    Lazy::force(&STOCK_REJECTIONS_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
