//! Structured logging configuration.
//!
//! Records from the `conseater` library go through the `log` facade and are
//! bridged into the same subscriber.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use cs_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log one estimation pass
///
/// # Arguments
///
/// * `table_type` - Table type the queue belongs to
/// * `entries` - Number of queued parties estimated
/// * `duration_ms` - Time taken, including the snapshot read
pub fn log_estimation(table_type: &str, entries: usize, duration_ms: u64) {
    if duration_ms > 500 {
        tracing::warn!(
            table_type = table_type,
            entries = entries,
            duration_ms = duration_ms,
            "Slow queue estimation"
        );
    } else {
        tracing::debug!(
            table_type = table_type,
            entries = entries,
            duration_ms = duration_ms,
            "Queue estimated"
        );
    }
}

/// Log a storage operation
///
/// # Arguments
///
/// * `operation` - What ran (e.g. `delete_orphans`)
/// * `rows` - Rows affected
/// * `duration_ms` - Duration in milliseconds
pub fn log_database_operation(operation: &str, rows: u64, duration_ms: u64) {
    tracing::debug!(
        operation = operation,
        rows = rows,
        duration_ms = duration_ms,
        "Database operation"
    );

    if duration_ms > 100 {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            "Slow database query detected"
        );
    }
}
