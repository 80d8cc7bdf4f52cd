use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{short_id, Side};
use crate::errors::EngineError;

/// Largest share count or dollar amount accepted anywhere in a scan.
///
/// Real trades and market volumes sit many orders of magnitude below this,
/// and keeping inputs under it leaves the scoring arithmetic headroom.
pub fn amount_limit() -> Decimal {
    Decimal::from(1_000_000_000_000i64)
}

/// A single venue trade as seen by the detection engine.
///
/// Prices are in cents (0–100). Immutable once a scan has picked it up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub market_id: String,
    pub market_question: String,
    pub market_slug: String,
    pub wallet_address: String,
    pub side: Side,
    pub price_cents: Decimal,
    pub shares: Decimal,
    pub notional_usd: Decimal,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub potential_return_pct: Option<Decimal>,
}

impl Trade {
    /// Composite dedup key. Venue trade ids are unreliable across
    /// overlapping scan windows, so they are not part of it.
    pub fn key(&self) -> TradeKey {
        TradeKey {
            wallet: self.wallet_address.clone(),
            market_id: self.market_id.clone(),
            timestamp: self.timestamp,
            side: self.side,
            shares: self.shares.normalize(),
        }
    }

    /// Return if the bet wins, in percent: (100 - p) / p * 100.
    pub fn potential_return(&self) -> Option<Decimal> {
        if self.potential_return_pct.is_some() {
            return self.potential_return_pct;
        }
        if self.price_cents <= Decimal::ZERO {
            return None;
        }
        (Decimal::ONE_HUNDRED - self.price_cents)
            .checked_div(self.price_cents)?
            .checked_mul(Decimal::ONE_HUNDRED)
    }

    /// Reject trades whose fields would skew scoring.
    pub fn validate(&self) -> Result<(), EngineError> {
        let fail = |reason: &str| Err(EngineError::invalid_trade(self.key().to_string(), reason));

        if self.wallet_address.trim().is_empty() {
            return fail("missing wallet address");
        }
        if self.market_id.trim().is_empty() {
            return fail("missing market id");
        }
        if self.price_cents < Decimal::ZERO || self.price_cents > Decimal::ONE_HUNDRED {
            return fail("price outside 0-100 cents");
        }
        if self.shares < Decimal::ZERO {
            return fail("negative share count");
        }
        if self.notional_usd < Decimal::ZERO {
            return fail("negative notional");
        }
        if self.shares > amount_limit() || self.notional_usd > amount_limit() {
            return fail("size or notional above accepted limit");
        }
        Ok(())
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trade: wallet={} market={} side={} price={}c notional=${}",
            short_id(&self.wallet_address),
            short_id(&self.market_id),
            self.side,
            self.price_cents,
            self.notional_usd.round_dp(2),
        )
    }
}

/// Composite identity of a trade: (wallet, market, timestamp, side, size).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradeKey {
    pub wallet: String,
    pub market_id: String,
    pub timestamp: DateTime<Utc>,
    pub side: Side,
    pub shares: Decimal,
}

impl fmt::Display for TradeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.wallet,
            self.market_id,
            self.side,
            self.shares,
            self.timestamp.to_rfc3339(),
        )
    }
}

/// Resolved result of a historical trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeOutcome {
    Won,
    Lost,
}

impl TradeOutcome {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "won" | "win" | "winner" | "true" => Some(TradeOutcome::Won),
            "lost" | "loss" | "loser" | "false" => Some(TradeOutcome::Lost),
            _ => None,
        }
    }
}

/// One entry of a wallet's supplied trade history. `outcome` is `None`
/// while the market is unresolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTrade {
    pub market_id: String,
    pub side: Side,
    pub notional_usd: Decimal,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub outcome: Option<TradeOutcome>,
}
