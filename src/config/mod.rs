use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::EngineError;
use crate::models::Severity;

/// Every tunable threshold of the detection engine. Passed into each scan
/// cycle explicitly and read-only for its duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    // Fresh wallet
    pub fresh_wallet_max_trades: u32,
    /// At or below this many trades the signal scores its full weight.
    pub fresh_wallet_full_score_trades: u32,
    pub fresh_wallet_min_markets: u32,
    pub fresh_wallet_weight: Decimal,

    // Position size
    pub whale_threshold_usd: Decimal,
    pub position_size_weight: Decimal,
    /// Share of market liquidity at which the liquidity bonus is maxed.
    pub liquidity_share_full: Decimal,
    pub liquidity_bonus_weight: Decimal,

    // Extreme odds (cents)
    pub low_odds_cut_cents: Decimal,
    pub high_odds_cut_cents: Decimal,
    /// Distance from 0 or 100 at which the signal scores its full weight.
    pub extreme_odds_full_margin_cents: Decimal,
    pub extreme_odds_weight: Decimal,

    // Market diversity
    pub max_unique_markets_suspicious: u32,
    pub diversity_full_markets: u32,
    pub market_diversity_weight: Decimal,

    // Volume spike
    pub volume_spike_zscore: Decimal,
    pub volume_baseline_min_samples: usize,
    pub volume_spike_weight: Decimal,

    // Win rate
    pub win_rate_suspicious_threshold: Decimal,
    pub win_rate_elevated_threshold: Decimal,
    pub win_rate_min_resolved: u32,
    pub win_rate_weight: Decimal,

    // Timing
    pub timing_window_hours: i64,
    pub timing_full_hours: i64,
    pub timing_weight: Decimal,

    // Scoring tiers
    pub min_alert_score: Decimal,
    pub medium_score: Decimal,
    pub high_score: Decimal,
    pub critical_score: Decimal,
    pub min_alert_severity: Severity,

    // Notional gate
    pub alert_min_notional: Decimal,
    pub medium_min_notional: Decimal,
    pub high_min_notional: Decimal,
    pub critical_min_notional: Decimal,

    // Wallet clusters
    pub cluster_window_minutes: i64,
    pub cluster_time_weight: Decimal,
    pub cluster_side_weight: Decimal,
    pub cluster_size_weight: Decimal,
    pub cluster_min_edge_weight: Decimal,
    pub cluster_min_correlation: Decimal,
    pub cluster_min_wallets: usize,
    pub cluster_max_market_trades: usize,

    // Cascades
    pub cascade_window_minutes: i64,
    pub cascade_min_followers: usize,
    pub cascade_volume_multiple: Decimal,
    pub cascade_min_same_side_ratio: Decimal,

    // Cross-cycle bookkeeping
    pub alert_retention_hours: i64,
    pub cluster_merge_overlap: Decimal,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            fresh_wallet_max_trades: 10,
            fresh_wallet_full_score_trades: 5,
            fresh_wallet_min_markets: 2,
            fresh_wallet_weight: Decimal::from(30),

            whale_threshold_usd: Decimal::from(5_000),
            position_size_weight: Decimal::from(25),
            liquidity_share_full: Decimal::new(10, 2), // 0.10
            liquidity_bonus_weight: Decimal::from(10),

            low_odds_cut_cents: Decimal::from(20),
            high_odds_cut_cents: Decimal::from(80),
            extreme_odds_full_margin_cents: Decimal::from(10),
            extreme_odds_weight: Decimal::from(20),

            max_unique_markets_suspicious: 30,
            diversity_full_markets: 3,
            market_diversity_weight: Decimal::from(15),

            volume_spike_zscore: Decimal::new(25, 1), // 2.5
            volume_baseline_min_samples: 3,
            volume_spike_weight: Decimal::from(30),

            win_rate_suspicious_threshold: Decimal::new(85, 2), // 0.85
            win_rate_elevated_threshold: Decimal::new(75, 2),   // 0.75
            win_rate_min_resolved: 10,
            win_rate_weight: Decimal::from(25),

            timing_window_hours: 48,
            timing_full_hours: 24,
            timing_weight: Decimal::from(10),

            min_alert_score: Decimal::from(20),
            medium_score: Decimal::from(30),
            high_score: Decimal::from(50),
            critical_score: Decimal::from(80),
            min_alert_severity: Severity::Low,

            alert_min_notional: Decimal::from(100),
            medium_min_notional: Decimal::from(500),
            high_min_notional: Decimal::from(2_000),
            critical_min_notional: Decimal::from(5_000),

            cluster_window_minutes: 15,
            cluster_time_weight: Decimal::new(4, 1), // 0.4
            cluster_side_weight: Decimal::new(3, 1), // 0.3
            cluster_size_weight: Decimal::new(3, 1), // 0.3
            cluster_min_edge_weight: Decimal::new(6, 1), // 0.6
            cluster_min_correlation: Decimal::new(7, 1), // 0.7
            cluster_min_wallets: 2,
            cluster_max_market_trades: 500,

            cascade_window_minutes: 60,
            cascade_min_followers: 5,
            cascade_volume_multiple: Decimal::from(3),
            cascade_min_same_side_ratio: Decimal::new(7, 1), // 0.7

            alert_retention_hours: 168,
            cluster_merge_overlap: Decimal::new(5, 1), // 0.5
        }
    }
}

/// Parse an env var, falling back to `default` when unset or unparsable.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(var = name, value = %raw, "Unparsable config value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

impl DetectionConfig {
    /// Defaults overridden by environment variables of the same name in
    /// upper case (e.g. `WHALE_THRESHOLD_USD=10000`).
    pub fn from_env() -> Result<Self, EngineError> {
        let d = Self::default();

        let min_alert_severity = match env::var("MIN_ALERT_SEVERITY") {
            Ok(raw) => raw
                .parse::<Severity>()
                .map_err(|e| EngineError::InvalidConfig(format!("MIN_ALERT_SEVERITY: {e}")))?,
            Err(_) => d.min_alert_severity,
        };

        let config = Self {
            fresh_wallet_max_trades: env_or("FRESH_WALLET_MAX_TRADES", d.fresh_wallet_max_trades),
            fresh_wallet_full_score_trades: env_or(
                "FRESH_WALLET_FULL_SCORE_TRADES",
                d.fresh_wallet_full_score_trades,
            ),
            fresh_wallet_min_markets: env_or("FRESH_WALLET_MIN_MARKETS", d.fresh_wallet_min_markets),
            fresh_wallet_weight: env_or("FRESH_WALLET_WEIGHT", d.fresh_wallet_weight),

            whale_threshold_usd: env_or("WHALE_THRESHOLD_USD", d.whale_threshold_usd),
            position_size_weight: env_or("POSITION_SIZE_WEIGHT", d.position_size_weight),
            liquidity_share_full: env_or("LIQUIDITY_SHARE_FULL", d.liquidity_share_full),
            liquidity_bonus_weight: env_or("LIQUIDITY_BONUS_WEIGHT", d.liquidity_bonus_weight),

            low_odds_cut_cents: env_or("LOW_ODDS_CUT_CENTS", d.low_odds_cut_cents),
            high_odds_cut_cents: env_or("HIGH_ODDS_CUT_CENTS", d.high_odds_cut_cents),
            extreme_odds_full_margin_cents: env_or(
                "EXTREME_ODDS_FULL_MARGIN_CENTS",
                d.extreme_odds_full_margin_cents,
            ),
            extreme_odds_weight: env_or("EXTREME_ODDS_WEIGHT", d.extreme_odds_weight),

            max_unique_markets_suspicious: env_or(
                "MAX_UNIQUE_MARKETS_SUSPICIOUS",
                d.max_unique_markets_suspicious,
            ),
            diversity_full_markets: env_or("DIVERSITY_FULL_MARKETS", d.diversity_full_markets),
            market_diversity_weight: env_or("MARKET_DIVERSITY_WEIGHT", d.market_diversity_weight),

            volume_spike_zscore: env_or("VOLUME_SPIKE_ZSCORE", d.volume_spike_zscore),
            volume_baseline_min_samples: env_or(
                "VOLUME_BASELINE_MIN_SAMPLES",
                d.volume_baseline_min_samples,
            ),
            volume_spike_weight: env_or("VOLUME_SPIKE_WEIGHT", d.volume_spike_weight),

            win_rate_suspicious_threshold: env_or(
                "WIN_RATE_SUSPICIOUS_THRESHOLD",
                d.win_rate_suspicious_threshold,
            ),
            win_rate_elevated_threshold: env_or(
                "WIN_RATE_ELEVATED_THRESHOLD",
                d.win_rate_elevated_threshold,
            ),
            win_rate_min_resolved: env_or("WIN_RATE_MIN_RESOLVED", d.win_rate_min_resolved),
            win_rate_weight: env_or("WIN_RATE_WEIGHT", d.win_rate_weight),

            timing_window_hours: env_or("TIMING_WINDOW_HOURS", d.timing_window_hours),
            timing_full_hours: env_or("TIMING_FULL_HOURS", d.timing_full_hours),
            timing_weight: env_or("TIMING_WEIGHT", d.timing_weight),

            min_alert_score: env_or("MIN_ALERT_SCORE", d.min_alert_score),
            medium_score: env_or("MEDIUM_SCORE", d.medium_score),
            high_score: env_or("HIGH_SCORE", d.high_score),
            critical_score: env_or("CRITICAL_SCORE", d.critical_score),
            min_alert_severity,

            alert_min_notional: env_or("ALERT_MIN_NOTIONAL", d.alert_min_notional),
            medium_min_notional: env_or("MEDIUM_MIN_NOTIONAL", d.medium_min_notional),
            high_min_notional: env_or("HIGH_MIN_NOTIONAL", d.high_min_notional),
            critical_min_notional: env_or("CRITICAL_MIN_NOTIONAL", d.critical_min_notional),

            cluster_window_minutes: env_or("CLUSTER_WINDOW_MINUTES", d.cluster_window_minutes),
            cluster_time_weight: env_or("CLUSTER_TIME_WEIGHT", d.cluster_time_weight),
            cluster_side_weight: env_or("CLUSTER_SIDE_WEIGHT", d.cluster_side_weight),
            cluster_size_weight: env_or("CLUSTER_SIZE_WEIGHT", d.cluster_size_weight),
            cluster_min_edge_weight: env_or("CLUSTER_MIN_EDGE_WEIGHT", d.cluster_min_edge_weight),
            cluster_min_correlation: env_or("CLUSTER_MIN_CORRELATION", d.cluster_min_correlation),
            cluster_min_wallets: env_or("CLUSTER_MIN_WALLETS", d.cluster_min_wallets),
            cluster_max_market_trades: env_or(
                "CLUSTER_MAX_MARKET_TRADES",
                d.cluster_max_market_trades,
            ),

            cascade_window_minutes: env_or("CASCADE_WINDOW_MINUTES", d.cascade_window_minutes),
            cascade_min_followers: env_or("CASCADE_MIN_FOLLOWERS", d.cascade_min_followers),
            cascade_volume_multiple: env_or("CASCADE_VOLUME_MULTIPLE", d.cascade_volume_multiple),
            cascade_min_same_side_ratio: env_or(
                "CASCADE_MIN_SAME_SIDE_RATIO",
                d.cascade_min_same_side_ratio,
            ),

            alert_retention_hours: env_or("ALERT_RETENTION_HOURS", d.alert_retention_hours),
            cluster_merge_overlap: env_or("CLUSTER_MERGE_OVERLAP", d.cluster_merge_overlap),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would break the scorer's invariants.
    pub fn validate(&self) -> Result<(), EngineError> {
        let fail = |msg: &str| Err(EngineError::InvalidConfig(msg.to_string()));

        let weights = [
            self.fresh_wallet_weight,
            self.position_size_weight,
            self.liquidity_bonus_weight,
            self.extreme_odds_weight,
            self.market_diversity_weight,
            self.volume_spike_weight,
            self.win_rate_weight,
            self.timing_weight,
        ];
        if weights.iter().any(|w| *w < Decimal::ZERO) {
            return fail("signal weights must be non-negative");
        }

        if self.fresh_wallet_full_score_trades >= self.fresh_wallet_max_trades {
            return fail("fresh_wallet_full_score_trades must be below fresh_wallet_max_trades");
        }
        if self.diversity_full_markets == 0 {
            return fail("diversity_full_markets must be positive");
        }

        let margin = self.extreme_odds_full_margin_cents;
        if !(margin < self.low_odds_cut_cents
            && self.low_odds_cut_cents < self.high_odds_cut_cents
            && self.high_odds_cut_cents < Decimal::ONE_HUNDRED - margin)
        {
            return fail("odds cuts must satisfy margin < low cut < high cut < 100 - margin");
        }

        if self.volume_spike_zscore <= Decimal::ZERO || self.volume_baseline_min_samples < 2 {
            return fail("volume spike needs a positive z threshold and at least 2 baseline samples");
        }

        if self.win_rate_elevated_threshold > self.win_rate_suspicious_threshold
            || self.win_rate_suspicious_threshold > Decimal::ONE
        {
            return fail("win rate thresholds must satisfy elevated <= suspicious <= 1");
        }

        if self.timing_full_hours < 0 || self.timing_full_hours >= self.timing_window_hours {
            return fail("timing_full_hours must be within [0, timing_window_hours)");
        }

        if !(self.min_alert_score <= self.medium_score
            && self.medium_score <= self.high_score
            && self.high_score <= self.critical_score)
        {
            return fail("score tiers must be non-decreasing");
        }

        if !(self.alert_min_notional <= self.medium_min_notional
            && self.medium_min_notional <= self.high_min_notional
            && self.high_min_notional <= self.critical_min_notional)
        {
            return fail("notional floors must be non-decreasing");
        }

        let sync_total = self.cluster_time_weight + self.cluster_side_weight + self.cluster_size_weight;
        if self.cluster_time_weight < Decimal::ZERO
            || self.cluster_side_weight < Decimal::ZERO
            || self.cluster_size_weight < Decimal::ZERO
            || sync_total != Decimal::ONE
        {
            return fail("cluster synchronisation weights must be non-negative and sum to 1");
        }
        if self.cluster_window_minutes <= 0 || self.cluster_min_wallets < 2 {
            return fail("cluster window must be positive and clusters need at least 2 wallets");
        }

        if self.cascade_window_minutes <= 0 || self.cascade_min_followers == 0 {
            return fail("cascade window and follower minimum must be positive");
        }

        if self.alert_retention_hours <= 0 {
            return fail("alert_retention_hours must be positive");
        }

        Ok(())
    }
}

/// Settings for the scan binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub snapshot_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    /// When set, the snapshot is replayed against this case instead of
    /// producing a scan report.
    pub backtest_case_path: Option<PathBuf>,
    pub log_json: bool,
    pub print_metrics: bool,
    pub detection: DetectionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            snapshot_path: env::var("SCAN_SNAPSHOT_PATH").ok().map(PathBuf::from),
            report_path: env::var("SCAN_REPORT_PATH").ok().map(PathBuf::from),
            backtest_case_path: env::var("BACKTEST_CASE_PATH").ok().map(PathBuf::from),
            log_json: env::var("LOG_JSON")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),
            print_metrics: env::var("PRINT_METRICS")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),
            detection: DetectionConfig::from_env()?,
        })
    }
}
