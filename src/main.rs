use anyhow::Context;
use chrono::Utc;
use std::path::PathBuf;

use polysentry::config::AppConfig;
use polysentry::intelligence::{activity_stats, rank_markets};
use polysentry::metrics::init_metrics;
use polysentry::services::{load_case, load_snapshot, run_backtest, ScanCoordinator};

const TOP_MARKETS: usize = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(config.log_json);

    let metrics_handle = if config.print_metrics {
        Some(init_metrics().context("failed to install Prometheus recorder")?)
    } else {
        None
    };

    let snapshot_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.snapshot_path.clone())
        .context("no snapshot given: pass a path or set SCAN_SNAPSHOT_PATH")?;

    tracing::info!(path = %snapshot_path.display(), "Reading scan snapshot");
    let input = load_snapshot(&snapshot_path).await?;

    if let Some(case_path) = &config.backtest_case_path {
        let case = load_case(case_path).await?;
        let result = run_backtest(&case, &input, &config.detection, Utc::now())?;
        write_output(&config, serde_json::to_string_pretty(&result)?).await?;
        if !result.passed {
            anyhow::bail!("backtest case {} failed", case.name);
        }
        return Ok(());
    }

    let coordinator = ScanCoordinator::new(config.detection.clone())?;
    let outcome = coordinator.run_cycle(input, Utc::now()).await?;

    let activity = activity_stats(&outcome.report.records);
    tracing::info!(
        scanned = activity.total_scanned,
        alert_rate = %activity.alert_rate,
        avg_score = %activity.avg_score,
        max_score = %activity.max_score,
        "Signal activity"
    );
    for signal in &activity.signal_breakdown {
        tracing::debug!(
            signal = %signal.signal,
            triggered = signal.times_triggered,
            avg_score = %signal.avg_score_when_triggered,
            "Signal breakdown"
        );
    }
    for market in rank_markets(&outcome.report.alerts, TOP_MARKETS) {
        tracing::info!(
            market = %market.market_id,
            alerts = market.alert_count,
            volume = %market.suspicious_volume_usd,
            max_severity = %market.max_severity,
            "Suspicious market"
        );
    }

    write_output(&config, serde_json::to_string_pretty(&outcome.report)?).await?;

    if let Some(handle) = metrics_handle {
        eprintln!("{}", handle.render());
    }

    Ok(())
}

async fn write_output(config: &AppConfig, body: String) -> anyhow::Result<()> {
    match &config.report_path {
        Some(path) => {
            tokio::fs::write(path, body)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "Report written");
        }
        None => println!("{body}"),
    }
    Ok(())
}

fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let registry = tracing_subscriber::registry().with(EnvFilter::from_default_env());
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}
