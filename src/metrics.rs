use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::models::Severity;

/// Install the Prometheus recorder and register all engine metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register counters so they appear even before the first increment.
    counter!("scan_cycles_total").absolute(0);
    counter!("trades_scored_total").absolute(0);
    counter!("trades_dropped_total").absolute(0);
    counter!("trades_excluded_total").absolute(0);
    counter!("clusters_detected_total").absolute(0);
    counter!("cascades_detected_total").absolute(0);
    for severity in [Severity::Low, Severity::Medium, Severity::High, Severity::Critical] {
        counter!("alerts_emitted_total", "severity" => severity.as_str()).absolute(0);
    }

    // Histogram is lazily created on first record; force creation.
    histogram!("scan_latency_seconds").record(0.0);

    Ok(handle)
}
