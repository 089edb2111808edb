//! Prometheus metrics for monitoring queue health and server performance.
//!
//! Metrics are exposed in Prometheus text format for scraping when an
//! exporter address is configured. Without one, the recording calls below
//! are no-ops.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts and durations
//! - **Queue Metrics**: Waiting parties per table type, estimation passes
//! - **Maintenance Metrics**: Orphaned people removed
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use cs_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("GET", "/api/queue", 200);
//! metrics::queue_length("mahjong", 12);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Queue Metrics
// ============================================================================

/// Set the number of parties waiting for a table type.
pub fn queue_length(table_type: &str, waiting: i64) {
    metrics::gauge!("queue_length",
        "type" => table_type.to_string()
    )
    .set(waiting as f64);
}

/// Record one estimation pass and its duration in milliseconds.
pub fn estimation_duration_ms(table_type: &str, duration_ms: f64) {
    metrics::counter!("estimations_total",
        "type" => table_type.to_string()
    )
    .increment(1);
    metrics::histogram!("estimation_duration_ms",
        "type" => table_type.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Maintenance Metrics
// ============================================================================

/// Count people removed by orphan cleanup.
pub fn orphans_removed_total(count: u64) {
    metrics::counter!("orphans_removed_total").increment(count);
}

/// Count failed maintenance passes.
pub fn maintenance_failures_total() {
    metrics::counter!("maintenance_failures_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter() {
        // No recorder installed; calls must be harmless
        http_requests_total("GET", "/health", 200);
        http_request_duration_ms("GET", "/health", 1.5);
        queue_length("mahjong", 3);
        estimation_duration_ms("mahjong", 0.2);
        orphans_removed_total(2);
        maintenance_failures_total();
    }
}
