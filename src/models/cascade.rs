use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Side, TradeKey};

/// A spark trade and the same-direction burst that followed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cascade {
    pub market_id: String,
    pub side: Side,
    pub spark: TradeKey,
    pub spark_trade_id: String,
    pub spark_wallet: String,
    pub spark_timestamp: DateTime<Utc>,
    pub followers: Vec<TradeKey>,
    pub follower_volume_usd: Decimal,
    /// Expected volume for the follow-on window from the market baseline.
    pub baseline_volume_usd: Decimal,
    pub volume_ratio: Decimal,
    pub window_end: DateTime<Utc>,
}
