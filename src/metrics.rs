use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::models::Chain;

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
///
/// Only one recorder can be installed per process; a second call errors.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {e}"))?;

    // Pre-register so every series appears before the first scan.
    for chain in Chain::ALL {
        let chain = chain.as_str();
        counter!("scanner_invocations_total", "chain" => chain).absolute(0);
        counter!("transactions_inserted_total", "chain" => chain).absolute(0);
        counter!("transfers_skipped_total", "chain" => chain).absolute(0);
        histogram!("scanner_duration_seconds", "chain" => chain).record(0.0);
    }
    counter!("scrape_runs_total", "outcome" => "completed").absolute(0);
    counter!("scrape_runs_total", "outcome" => "failed").absolute(0);
    gauge!("scrape_run_progress").set(0.0);

    Ok(handle)
}
