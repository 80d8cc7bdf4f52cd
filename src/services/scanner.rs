use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::DetectionConfig;
use crate::errors::EngineError;
use crate::ingestion::pipeline::{run_scan_cycle, ScanInput, ScanReport};
use crate::models::{Alert, WalletCluster};
use crate::services::ledger::{AlertLedger, ClusterRegistry};

/// Cross-cycle state. Only touched while the coordinator lock is held.
#[derive(Debug)]
struct LedgerState {
    alerts: AlertLedger,
    clusters: ClusterRegistry,
    cycles: u64,
}

/// Result of one coordinated cycle.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub cycle: u64,
    /// Full engine output, before cross-cycle dedup.
    pub report: ScanReport,
    /// Alerts not emitted by any earlier cycle within retention.
    pub new_alerts: Vec<Alert>,
    pub duplicates_suppressed: usize,
    /// Tracked clusters updated by this cycle.
    pub tracked_clusters: Vec<WalletCluster>,
}

/// Serialises scan cycles and owns the dedup ledger.
///
/// The lock is held for the whole cycle, so a new cycle waits for the
/// previous one. The engine runs on the blocking pool and its output is
/// only published once it has finished: dropping the `run_cycle` future
/// discards the batch.
pub struct ScanCoordinator {
    config: Arc<DetectionConfig>,
    state: Mutex<LedgerState>,
}

impl ScanCoordinator {
    pub fn new(config: DetectionConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let retention = Duration::hours(config.alert_retention_hours);

        Ok(Self {
            state: Mutex::new(LedgerState {
                alerts: AlertLedger::new(retention),
                clusters: ClusterRegistry::new(config.cluster_merge_overlap, retention),
                cycles: 0,
            }),
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub async fn run_cycle(&self, input: ScanInput, now: DateTime<Utc>) -> anyhow::Result<CycleOutcome> {
        let mut state = self.state.lock().await;
        let cycle = state.cycles + 1;

        tracing::info!(cycle, trades = input.trades.len(), "Scan cycle started");

        let config = Arc::clone(&self.config);
        let report = tokio::task::spawn_blocking(move || run_scan_cycle(&input, &config, now))
            .await
            .context("scan cycle task failed")??;

        let (new_alerts, duplicates_suppressed) = state.alerts.admit(&report.alerts, now);
        let tracked_clusters = state.clusters.track(&report.clusters, now);
        state.cycles = cycle;

        tracing::info!(
            cycle,
            new_alerts = new_alerts.len(),
            duplicates_suppressed,
            tracked_clusters = tracked_clusters.len(),
            ledger_size = state.alerts.len(),
            "Scan cycle published"
        );

        Ok(CycleOutcome {
            cycle,
            report,
            new_alerts,
            duplicates_suppressed,
            tracked_clusters,
        })
    }

    pub async fn cycles_completed(&self) -> u64 {
        self.state.lock().await.cycles
    }

    pub async fn clusters(&self) -> Vec<WalletCluster> {
        self.state.lock().await.clusters.clusters()
    }
}
