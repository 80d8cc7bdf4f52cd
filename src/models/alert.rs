use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{SignalResult, Trade, TradeKey, WalletProfile};

/// Alert severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw scoring record kept for every scored trade, alerting or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub key: TradeKey,
    pub trade: Trade,
    pub signals: Vec<SignalResult>,
    /// Uncapped sum of signal scores.
    pub total_score: Decimal,
    /// `min(100, total_score)`.
    pub suspicion_score: Decimal,
    /// Tier from the score alone, before the notional gate.
    pub raw_severity: Severity,
    /// Tier after the notional gate; `None` when the gate forbids alerting.
    pub severity: Option<Severity>,
    pub insider_probability: Decimal,
    pub is_alert: bool,
}

/// A trade surfaced as suspicious.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub key: TradeKey,
    pub trade: Trade,
    pub wallet_profile: WalletProfile,
    pub signals: Vec<SignalResult>,
    pub suspicion_score: Decimal,
    pub severity: Severity,
    pub insider_probability: Decimal,
    pub narrative: String,
    /// Key of the spark trade when this trade followed one in a cascade.
    pub cascade_spark: Option<TradeKey>,
    pub created_at: DateTime<Utc>,
}
