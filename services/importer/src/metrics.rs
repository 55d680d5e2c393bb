//! Prometheus counters for scheduled runs.
//!
//! Without an installed exporter the `metrics` macros are no-ops, so `run`
//! mode records into nothing.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use crate::pipeline::RunOutcome;

/// Serve `/metrics` on `0.0.0.0:port`.
pub fn install_exporter(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus exporter")?;
    info!(port, "Prometheus metrics exporter listening");
    Ok(())
}

pub fn record_outcome(outcome: &RunOutcome) {
    metrics::counter!("importer_runs_total", "result" => outcome.label()).increment(1);

    match outcome {
        RunOutcome::Imported { summary } => {
            let count = &summary.import_count;
            metrics::counter!("importer_values_imported_total").increment(count.imported);
            metrics::counter!("importer_values_updated_total").increment(count.updated);
            metrics::counter!("importer_values_ignored_total").increment(count.ignored);
            metrics::counter!("importer_values_deleted_total").increment(count.deleted);
        }
        RunOutcome::DryRun { values } => {
            metrics::counter!("importer_values_dry_run_total").increment(*values as u64);
        }
        RunOutcome::NothingToImport | RunOutcome::NoData => {}
    }
}

pub fn record_failure() {
    metrics::counter!("importer_runs_total", "result" => "failed").increment(1);
}
