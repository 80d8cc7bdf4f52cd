use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Point-in-time statistical profile of a wallet, rebuilt every scan cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletProfile {
    pub address: String,
    pub total_trades: u32,
    pub unique_markets: u32,
    pub total_volume_usd: Decimal,
    /// `None` means no resolved trades, never "0% win rate".
    pub win_rate: Option<Decimal>,
    /// Sample size behind `win_rate`.
    pub resolved_trades: u32,
    pub first_seen_at: Option<DateTime<Utc>>,
    pub last_active_at: Option<DateTime<Utc>>,
}

impl WalletProfile {
    /// Profile for a wallet with no usable history.
    pub fn empty(address: &str) -> Self {
        Self {
            address: address.to_string(),
            total_trades: 0,
            unique_markets: 0,
            total_volume_usd: Decimal::ZERO,
            win_rate: None,
            resolved_trades: 0,
            first_seen_at: None,
            last_active_at: None,
        }
    }

    pub fn avg_trade_usd(&self) -> Option<Decimal> {
        if self.total_trades == 0 || self.total_volume_usd <= Decimal::ZERO {
            return None;
        }
        Some(self.total_volume_usd / Decimal::from(self.total_trades))
    }
}
