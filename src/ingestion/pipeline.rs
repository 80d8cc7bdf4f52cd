use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use crate::config::DetectionConfig;
use crate::errors::EngineError;
use crate::intelligence::scorer::build_alert;
use crate::intelligence::{
    build_wallet_profile, detect_cascades, detect_clusters, score_trade, spark_links, SignalInput,
};
use crate::models::{
    Alert, Cascade, HistoryTrade, MarketContext, ScoreRecord, Trade, TradeKey, WalletCluster,
    WalletProfile,
};

/// One batch of work for the engine.
#[derive(Debug, Clone, Default)]
pub struct ScanInput {
    pub trades: Vec<Trade>,
    /// Wallet address → supplied history. Missing wallets have no history.
    pub histories: HashMap<String, Vec<HistoryTrade>>,
    pub markets: HashMap<String, MarketContext>,
    /// Raw records rejected before the batch was built.
    pub dropped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub received: usize,
    pub dropped: usize,
    pub excluded: usize,
    pub duplicates: usize,
    pub scored: usize,
    pub alerts: usize,
    pub clusters: usize,
    pub cascades: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub generated_at: DateTime<Utc>,
    /// Suspicion desc, then most recent first, then key.
    pub alerts: Vec<Alert>,
    /// Correlation desc.
    pub clusters: Vec<WalletCluster>,
    pub cascades: Vec<Cascade>,
    /// Every scored trade, alerting or not, in batch order.
    pub records: Vec<ScoreRecord>,
    pub stats: ScanStats,
}

/// Run one scan cycle over a batch.
///
/// 1. Validate and drop in-batch duplicates (by composite key)
/// 2. Build one profile per distinct wallet
/// 3. Score every trade through all evaluators
/// 4. Detect clusters and cascades over the full scored batch
/// 5. Assemble alerts, linking cascade followers to their spark
///
/// Pure in `(input, config, now)`: the same arguments give the same report.
/// Fails only on a configuration that does not pass validation.
pub fn run_scan_cycle(
    input: &ScanInput,
    config: &DetectionConfig,
    now: DateTime<Utc>,
) -> Result<ScanReport, EngineError> {
    config.validate()?;

    let start = Instant::now();
    let mut stats = ScanStats {
        received: input.trades.len(),
        dropped: input.dropped,
        ..ScanStats::default()
    };

    // Step 1: validation and dedup
    let mut seen: HashSet<TradeKey> = HashSet::with_capacity(input.trades.len());
    let mut trades: Vec<&Trade> = Vec::with_capacity(input.trades.len());

    for trade in &input.trades {
        if let Err(e) = trade.validate() {
            tracing::debug!(error = %e, "Excluding invalid trade");
            counter!("trades_excluded_total").increment(1);
            stats.excluded += 1;
            continue;
        }
        if !seen.insert(trade.key()) {
            tracing::debug!(
                wallet = %trade.wallet_address,
                market = %trade.market_id,
                "Duplicate trade in batch, skipping"
            );
            stats.duplicates += 1;
            continue;
        }
        trades.push(trade);
    }

    // Step 2: one profile per wallet
    let mut profiles: BTreeMap<&str, WalletProfile> = BTreeMap::new();
    for trade in &trades {
        let wallet = trade.wallet_address.as_str();
        profiles.entry(wallet).or_insert_with(|| {
            let history = input.histories.get(wallet).map(Vec::as_slice).unwrap_or(&[]);
            build_wallet_profile(wallet, history)
        });
    }

    // Step 3: score
    let mut records = Vec::with_capacity(trades.len());
    for &trade in &trades {
        let fallback;
        let market = match input.markets.get(&trade.market_id) {
            Some(m) => m,
            None => {
                fallback = MarketContext::unknown(&trade.market_id);
                &fallback
            }
        };
        let Some(profile) = profiles.get(trade.wallet_address.as_str()) else {
            continue;
        };

        let signal_input = SignalInput { trade, profile, market };
        records.push(score_trade(&signal_input, config));
    }
    stats.scored = records.len();
    counter!("trades_scored_total").increment(records.len() as u64);
    counter!("trades_dropped_total").increment(input.dropped as u64);

    // Step 4: batch-level detection, only once every trade is scored
    let valid: Vec<Trade> = trades.iter().map(|t| (*t).clone()).collect();
    let clusters = detect_clusters(&valid, config);
    let cascades = detect_cascades(&valid, &input.markets, config);
    let links = spark_links(&cascades);

    // Step 5: alerts
    let mut alerts: Vec<Alert> = records
        .iter()
        .filter(|r| r.is_alert)
        .filter_map(|record| {
            let profile = profiles.get(record.trade.wallet_address.as_str())?;
            build_alert(record, profile, links.get(&record.key).cloned(), now, config)
        })
        .collect();

    alerts.sort_by(|a, b| {
        b.suspicion_score
            .cmp(&a.suspicion_score)
            .then_with(|| b.trade.timestamp.cmp(&a.trade.timestamp))
            .then_with(|| a.key.cmp(&b.key))
    });

    for alert in &alerts {
        tracing::info!(
            wallet = %alert.trade.wallet_address,
            market = %alert.trade.market_id,
            score = %alert.suspicion_score,
            severity = %alert.severity,
            notional = %alert.trade.notional_usd,
            cascade_follower = alert.cascade_spark.is_some(),
            "Suspicious trade flagged"
        );
        counter!("alerts_emitted_total", "severity" => alert.severity.as_str()).increment(1);
    }

    stats.alerts = alerts.len();
    stats.clusters = clusters.len();
    stats.cascades = cascades.len();

    counter!("clusters_detected_total").increment(clusters.len() as u64);
    counter!("cascades_detected_total").increment(cascades.len() as u64);
    counter!("scan_cycles_total").increment(1);
    histogram!("scan_latency_seconds").record(start.elapsed().as_secs_f64());

    tracing::info!(
        received = stats.received,
        dropped = stats.dropped,
        excluded = stats.excluded,
        duplicates = stats.duplicates,
        scored = stats.scored,
        alerts = stats.alerts,
        clusters = stats.clusters,
        cascades = stats.cascades,
        "Scan cycle complete"
    );

    Ok(ScanReport {
        generated_at: now,
        alerts,
        clusters,
        cascades,
        records,
        stats,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
