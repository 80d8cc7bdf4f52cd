use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Loose scalars
// ---------------------------------------------------------------------------

/// A number the venue may send either as a JSON number or as a string.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(serde_json::Number),
    Text(String),
}

impl RawNumber {
    /// Exact decimal value, or `None` for anything non-numeric or non-finite.
    pub fn to_decimal(&self) -> Option<Decimal> {
        let text = match self {
            RawNumber::Number(n) => n.to_string(),
            RawNumber::Text(s) => s.trim().to_string(),
        };
        if text.is_empty() {
            return None;
        }
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .ok()
    }
}

impl From<i64> for RawNumber {
    fn from(value: i64) -> Self {
        RawNumber::Number(value.into())
    }
}

impl From<&str> for RawNumber {
    fn from(value: &str) -> Self {
        RawNumber::Text(value.to_string())
    }
}

/// Epoch seconds (or milliseconds), RFC 3339, or a bare date.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Epoch(i64),
    Text(String),
}

/// Epoch values past this are taken as milliseconds.
const EPOCH_MILLIS_CUTOFF: i64 = 100_000_000_000;

impl RawTimestamp {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Epoch(n) => from_epoch(*n),
            RawTimestamp::Text(s) => {
                let s = s.trim();
                if let Ok(n) = s.parse::<i64>() {
                    return from_epoch(n);
                }
                if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                    return Some(dt.with_timezone(&Utc));
                }
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
            }
        }
    }
}

fn from_epoch(n: i64) -> Option<DateTime<Utc>> {
    if n.abs() >= EPOCH_MILLIS_CUTOFF {
        DateTime::from_timestamp_millis(n)
    } else {
        DateTime::from_timestamp(n, 0)
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        RawTimestamp::Epoch(value.timestamp())
    }
}

// ---------------------------------------------------------------------------
// Records (Data API / Gamma shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawTrade {
    #[serde(default, alias = "transactionHash")]
    pub id: Option<String>,
    #[serde(default, alias = "proxyWallet", alias = "maker", alias = "wallet_address")]
    pub wallet: Option<String>,
    #[serde(default, alias = "market", alias = "conditionId", alias = "condition_id")]
    pub market_id: Option<String>,
    #[serde(default, alias = "title", alias = "question")]
    pub market_question: Option<String>,
    #[serde(default, alias = "slug")]
    pub market_slug: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub price: Option<RawNumber>,
    /// Share count.
    #[serde(default, alias = "shares")]
    pub size: Option<RawNumber>,
    /// Dollar notional.
    #[serde(default, alias = "usdcSize", alias = "usdc_size", alias = "notional_usd")]
    pub notional: Option<RawNumber>,
    #[serde(default, alias = "time", alias = "matchTime")]
    pub timestamp: Option<RawTimestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawHistoryTrade {
    #[serde(default, alias = "market", alias = "conditionId", alias = "condition_id")]
    pub market_id: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub price: Option<RawNumber>,
    #[serde(default, alias = "shares")]
    pub size: Option<RawNumber>,
    #[serde(default, alias = "usdcSize", alias = "usdc_size", alias = "notional_usd")]
    pub notional: Option<RawNumber>,
    #[serde(default, alias = "time")]
    pub timestamp: Option<RawTimestamp>,
    /// "won"/"lost"; absent while unresolved.
    #[serde(default, alias = "result")]
    pub outcome: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawMarket {
    #[serde(default, alias = "title")]
    pub question: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, alias = "liquidityNum", alias = "liquidity_usd")]
    pub liquidity: Option<RawNumber>,
    #[serde(default, alias = "volume24hr", alias = "volume_24h_usd")]
    pub volume_24h: Option<RawNumber>,
    /// Prior daily volumes, oldest first.
    #[serde(default, alias = "volumeHistory", alias = "volume_history_usd")]
    pub volume_history: Vec<RawNumber>,
    #[serde(default, alias = "endDate", alias = "end_date_iso", alias = "endDateIso")]
    pub resolution_time: Option<RawTimestamp>,
}

/// Everything one scan cycle needs, as delivered by the venue client.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ScanSnapshot {
    #[serde(default)]
    pub trades: Vec<RawTrade>,
    /// Wallet address → trade history.
    #[serde(default)]
    pub wallets: HashMap<String, Vec<RawHistoryTrade>>,
    /// Market id → metadata.
    #[serde(default)]
    pub markets: HashMap<String, RawMarket>,
}
