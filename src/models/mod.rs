pub mod alert;
pub mod cascade;
pub mod cluster;
pub mod market;
pub mod signal;
pub mod trade;
pub mod wallet;

pub use alert::{Alert, ScoreRecord, Severity};
pub use cascade::Cascade;
pub use cluster::WalletCluster;
pub use market::MarketContext;
pub use signal::{SignalKind, SignalResult};
pub use trade::{amount_limit, HistoryTrade, Trade, TradeKey, TradeOutcome};
pub use wallet::WalletProfile;

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BUY" | "0" => Some(Side::Buy),
            "SELL" | "1" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Shorten a wallet address or market id for log lines and narratives.
pub fn short_id(id: &str) -> String {
    if id.len() > 10 && id.is_ascii() {
        format!("{}...{}", &id[..6], &id[id.len() - 4..])
    } else {
        id.to_string()
    }
}
