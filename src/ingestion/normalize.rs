use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

use super::pipeline::ScanInput;
use super::types::{RawHistoryTrade, RawMarket, RawNumber, RawTrade, ScanSnapshot};
use crate::models::{amount_limit, HistoryTrade, MarketContext, Side, Trade, TradeOutcome};

/// Why a raw record was discarded before scoring.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropReason {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("unparsable {0}")]
    Unparsable(&'static str),

    #[error("{0} out of range")]
    OutOfRange(&'static str),

    #[error("unknown side {0:?}")]
    UnknownSide(String),
}

/// Typed result of normalising one snapshot.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub trades: Vec<Trade>,
    pub histories: HashMap<String, Vec<HistoryTrade>>,
    pub markets: HashMap<String, MarketContext>,
    /// Raw trades that could not be normalised.
    pub dropped: usize,
    /// Raw history entries that could not be normalised.
    pub history_dropped: usize,
}

impl NormalizedBatch {
    pub fn into_input(self) -> ScanInput {
        ScanInput {
            trades: self.trades,
            histories: self.histories,
            markets: self.markets,
            dropped: self.dropped,
        }
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn required_text(value: Option<&String>, field: &'static str) -> Result<String, DropReason> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(DropReason::Missing(field))
}

fn optional_number(value: Option<&RawNumber>, field: &'static str) -> Result<Option<Decimal>, DropReason> {
    match value {
        None => Ok(None),
        Some(raw) => raw.to_decimal().map(Some).ok_or(DropReason::Unparsable(field)),
    }
}

fn parse_side(value: Option<&String>) -> Result<Side, DropReason> {
    let raw = value.ok_or(DropReason::Missing("side"))?;
    Side::from_api_str(raw).ok_or_else(|| DropReason::UnknownSide(raw.clone()))
}

/// Prices at or below 1 are probabilities; everything is returned in cents.
pub fn price_to_cents(price: Decimal) -> Result<Decimal, DropReason> {
    if price < Decimal::ZERO {
        return Err(DropReason::OutOfRange("price"));
    }
    let cents = if price <= Decimal::ONE {
        price * Decimal::ONE_HUNDRED
    } else {
        price
    };
    if cents > Decimal::ONE_HUNDRED {
        return Err(DropReason::OutOfRange("price"));
    }
    Ok(cents)
}

/// Fill in whichever of shares/notional is missing from the other.
fn size_and_notional(
    shares: Option<Decimal>,
    notional: Option<Decimal>,
    price_cents: Decimal,
) -> Result<(Decimal, Decimal), DropReason> {
    let per_share = price_cents / Decimal::ONE_HUNDRED;
    let (shares, notional) = match (shares, notional) {
        (Some(s), Some(n)) => (s, n),
        (Some(s), None) => (s, s * per_share),
        (None, Some(n)) if per_share > Decimal::ZERO => {
            (n.checked_div(per_share).ok_or(DropReason::OutOfRange("size"))?, n)
        }
        (None, Some(_)) => return Err(DropReason::Missing("size")),
        (None, None) => return Err(DropReason::Missing("size")),
    };
    if shares < Decimal::ZERO || shares > amount_limit() {
        return Err(DropReason::OutOfRange("size"));
    }
    if notional < Decimal::ZERO || notional > amount_limit() {
        return Err(DropReason::OutOfRange("notional"));
    }
    Ok((shares, notional))
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

pub fn normalize_trade(raw: &RawTrade) -> Result<Trade, DropReason> {
    let wallet_address = required_text(raw.wallet.as_ref(), "wallet")?;
    let market_id = required_text(raw.market_id.as_ref(), "market")?;
    let side = parse_side(raw.side.as_ref())?;

    let price = optional_number(raw.price.as_ref(), "price")?.ok_or(DropReason::Missing("price"))?;
    let price_cents = price_to_cents(price)?;

    let (shares, notional_usd) = size_and_notional(
        optional_number(raw.size.as_ref(), "size")?,
        optional_number(raw.notional.as_ref(), "notional")?,
        price_cents,
    )?;

    let timestamp = raw
        .timestamp
        .as_ref()
        .ok_or(DropReason::Missing("timestamp"))?
        .to_datetime()
        .ok_or(DropReason::Unparsable("timestamp"))?;

    let mut trade = Trade {
        id: String::new(),
        market_id,
        market_question: raw.market_question.clone().unwrap_or_default(),
        market_slug: raw.market_slug.clone().unwrap_or_default(),
        wallet_address,
        side,
        price_cents,
        shares,
        notional_usd,
        timestamp,
        potential_return_pct: None,
    };
    trade.id = match raw.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => trade.key().to_string(),
    };
    Ok(trade)
}

pub fn normalize_history(raw: &RawHistoryTrade) -> Result<HistoryTrade, DropReason> {
    let market_id = required_text(raw.market_id.as_ref(), "market")?;
    let side = parse_side(raw.side.as_ref())?;

    let notional_usd = match optional_number(raw.notional.as_ref(), "notional")? {
        Some(n) => n,
        None => {
            let size = optional_number(raw.size.as_ref(), "size")?.ok_or(DropReason::Missing("notional"))?;
            let price = optional_number(raw.price.as_ref(), "price")?.ok_or(DropReason::Missing("price"))?;
            size.checked_mul(price_to_cents(price)? / Decimal::ONE_HUNDRED)
                .ok_or(DropReason::OutOfRange("notional"))?
        }
    };
    if notional_usd < Decimal::ZERO || notional_usd > amount_limit() {
        return Err(DropReason::OutOfRange("notional"));
    }

    let timestamp = raw
        .timestamp
        .as_ref()
        .ok_or(DropReason::Missing("timestamp"))?
        .to_datetime()
        .ok_or(DropReason::Unparsable("timestamp"))?;

    Ok(HistoryTrade {
        market_id,
        side,
        notional_usd,
        timestamp,
        outcome: raw.outcome.as_deref().and_then(TradeOutcome::from_api_str),
    })
}

/// Market metadata never drops: unusable fields simply become unknown.
/// Negative or implausibly large amounts count as unusable.
pub fn normalize_market(market_id: &str, raw: &RawMarket) -> MarketContext {
    let usable = |n: Option<&RawNumber>| {
        n.and_then(RawNumber::to_decimal)
            .filter(|d| *d >= Decimal::ZERO && *d <= amount_limit())
    };

    MarketContext {
        market_id: market_id.to_string(),
        question: raw.question.clone().filter(|q| !q.trim().is_empty()),
        slug: raw.slug.clone().filter(|s| !s.trim().is_empty()),
        liquidity_usd: usable(raw.liquidity.as_ref()),
        volume_24h_usd: usable(raw.volume_24h.as_ref()),
        volume_history_usd: raw.volume_history.iter().filter_map(|n| usable(Some(n))).collect(),
        resolution_time: raw.resolution_time.as_ref().and_then(|t| t.to_datetime()),
    }
}

/// Convert a raw snapshot into typed records, dropping what cannot be used.
pub fn normalize_snapshot(snapshot: &ScanSnapshot) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();

    for (market_id, raw) in &snapshot.markets {
        batch.markets.insert(market_id.clone(), normalize_market(market_id, raw));
    }

    for raw in &snapshot.trades {
        match normalize_trade(raw) {
            Ok(mut trade) => {
                if trade.market_question.is_empty() {
                    if let Some(question) = batch.markets.get(&trade.market_id).and_then(|m| m.question.clone()) {
                        trade.market_question = question;
                    }
                }
                batch.trades.push(trade);
            }
            Err(reason) => {
                tracing::debug!(
                    wallet = ?raw.wallet,
                    market = ?raw.market_id,
                    reason = %reason,
                    "Dropping raw trade"
                );
                batch.dropped += 1;
            }
        }
    }

    for (wallet, entries) in &snapshot.wallets {
        let history = batch.histories.entry(wallet.clone()).or_default();
        for raw in entries {
            match normalize_history(raw) {
                Ok(entry) => history.push(entry),
                Err(reason) => {
                    tracing::debug!(wallet = %wallet, reason = %reason, "Dropping history entry");
                    batch.history_dropped += 1;
                }
            }
        }
    }

    tracing::info!(
        trades = batch.trades.len(),
        dropped = batch.dropped,
        wallets = batch.histories.len(),
        history_dropped = batch.history_dropped,
        markets = batch.markets.len(),
        "Snapshot normalised"
    );

    batch
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
