//! Prometheus snapshot of the runtime's metrics.
//!
//! A command lives too briefly to be scraped. With `observability.metrics`
//! enabled the recorder is installed at start-up and the text exposition is
//! written to stderr when the command finishes.

use metrics::{Unit, describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// A recorder is already installed or the exporter could not be built
    #[error("Failed to install metrics recorder: {0}")]
    Install(String),
}

/// Installs the global Prometheus recorder.
///
/// # Errors
///
/// Returns `MetricsError::Install` if a recorder is already installed.
pub fn install() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;
    describe();
    Ok(handle)
}

/// Registers descriptions for everything the aggregator records.
pub fn describe() {
    describe_counter!("todo.load.total", "Loads started");
    describe_counter!(
        "todo.load.stale",
        "Load results dropped because a newer load started"
    );
    describe_histogram!(
        "todo.load.duration_seconds",
        Unit::Seconds,
        "Time to fetch and merge both sources"
    );
    describe_counter!("todo.add.total", "Todos written to the document store");
    describe_counter!("todo.update.total", "Updates by owning source");
    describe_counter!("todo.delete.total", "Deletes by owning source");
    describe_counter!("todo.operation.failed", "Failed operations by kind");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_includes_described_runtime_counters() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe();
            metrics::counter!("todo.load.total").increment(2);
            metrics::counter!("todo.delete.total", "source" => "feed").increment(1);
        });

        let text = handle.render();
        assert!(text.contains("Loads started"));
        assert!(text.contains("todo_load_total 2"));
        assert!(text.contains("todo_delete_total{source=\"feed\"} 1"));
    }
}
