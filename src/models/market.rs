use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Optional enrichment for a market. Every field may be missing; evaluators
/// that need a missing field score zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketContext {
    pub market_id: String,
    pub question: Option<String>,
    pub slug: Option<String>,
    pub liquidity_usd: Option<Decimal>,
    pub volume_24h_usd: Option<Decimal>,
    /// Prior daily volumes, oldest first.
    #[serde(default)]
    pub volume_history_usd: Vec<Decimal>,
    /// Known or estimated resolution time.
    pub resolution_time: Option<DateTime<Utc>>,
}

impl MarketContext {
    pub fn unknown(market_id: &str) -> Self {
        Self {
            market_id: market_id.to_string(),
            ..Default::default()
        }
    }
}
