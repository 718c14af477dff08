//! Prometheus metrics for commerce-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "commerce_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Invoice counter by status.
pub static INVOICES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "commerce_invoices_total",
        "Total number of invoices by status",
        &["status"] // draft, sent, paid, overdue, cancelled
    )
    .expect("Failed to register invoices_total")
});

/// Cart operation counter.
pub static CART_OPERATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "commerce_cart_operations_total",
        "Total number of cart operations",
        &["operation"] // add, update, remove, clear
    )
    .expect("Failed to register cart_operations_total")
});

/// CSV import row counter by entity and outcome.
pub static CSV_IMPORT_ROWS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "commerce_csv_import_rows_total",
        "CSV import rows by entity and outcome",
        &["entity", "outcome"] // accepted, dropped
    )
    .expect("Failed to register csv_import_rows_total")
});

/// Invoice number allocation retry counter.
pub static NUMBER_ALLOCATION_RETRIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "commerce_number_allocation_retries_total",
        "Invoice number allocations retried after a uniqueness conflict",
        &["outcome"] // retried, exhausted
    )
    .expect("Failed to register number_allocation_retries_total")
});

/// Force registration of all metrics. Call once at startup.
pub fn init_metrics() {
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&INVOICES_TOTAL);
    Lazy::force(&CART_OPERATIONS_TOTAL);
    Lazy::force(&CSV_IMPORT_ROWS_TOTAL);
    Lazy::force(&NUMBER_ALLOCATION_RETRIES_TOTAL);
}

/// Encode all registered metrics in the Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
