use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The behavioural hypotheses tested against every trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    FreshWallet,
    PositionSize,
    ExtremeOdds,
    MarketDiversity,
    VolumeSpike,
    WinRateAnomaly,
    Timing,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::FreshWallet => "fresh_wallet",
            SignalKind::PositionSize => "position_size",
            SignalKind::ExtremeOdds => "extreme_odds",
            SignalKind::MarketDiversity => "market_diversity",
            SignalKind::VolumeSpike => "volume_spike",
            SignalKind::WinRateAnomaly => "win_rate_anomaly",
            SignalKind::Timing => "timing",
        }
    }

    /// Human-readable label used in narratives.
    pub fn label(&self) -> &'static str {
        match self {
            SignalKind::FreshWallet => "Fresh Wallet",
            SignalKind::PositionSize => "Position Size",
            SignalKind::ExtremeOdds => "Extreme Odds",
            SignalKind::MarketDiversity => "Market Diversity",
            SignalKind::VolumeSpike => "Volume Spike",
            SignalKind::WinRateAnomaly => "Win Rate Anomaly",
            SignalKind::Timing => "Timing",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one evaluator for one trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub signal: SignalKind,
    /// Zero when the evaluator's condition is not met.
    pub score: Decimal,
    pub details: String,
    pub threshold_used: Decimal,
}

impl SignalResult {
    pub fn new(
        signal: SignalKind,
        score: Decimal,
        details: impl Into<String>,
        threshold_used: Decimal,
    ) -> Self {
        Self {
            signal,
            score: score.max(Decimal::ZERO),
            details: details.into(),
            threshold_used,
        }
    }

    pub fn quiet(signal: SignalKind, details: impl Into<String>, threshold_used: Decimal) -> Self {
        Self::new(signal, Decimal::ZERO, details, threshold_used)
    }

    pub fn triggered(&self) -> bool {
        self.score > Decimal::ZERO
    }
}
