//! Metrics recording for storage operations.

use std::time::Instant;

/// Records operation metrics for a storage call.
///
/// This function records two metrics for each operation:
/// 1. `vercat_storage_operations_total` - Counter for operation count by status
/// 2. `vercat_storage_operation_duration_ms` - Histogram for operation latency
///
/// # Examples
///
/// ```ignore
/// use std::time::Instant;
///
/// let start = Instant::now();
/// // ... perform operation ...
/// let status = if result.is_ok() { "success" } else { "error" };
/// record_operation_metrics("sqlite", "insert", start, status);
/// ```
pub fn record_operation_metrics(
    backend: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "vercat_storage_operations_total",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "vercat_storage_operation_duration_ms",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Returns the status label for a result.
pub const fn status_of<T>(result: &crate::Result<T>) -> &'static str {
    if result.is_ok() { "success" } else { "error" }
}
