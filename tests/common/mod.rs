use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

use polysentry::ingestion::ScanInput;
use polysentry::models::{HistoryTrade, MarketContext, Side, Trade, TradeOutcome};

/// Fixed clock so alerts are reproducible.
#[allow(dead_code)]
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 3, 12, 0, 0).unwrap()
}

/// Build a trade. `price` is in cents; shares follow from the notional.
#[allow(dead_code)]
pub fn make_trade(
    wallet: &str,
    market: &str,
    side: Side,
    price: i64,
    notional: i64,
    at: DateTime<Utc>,
) -> Trade {
    Trade {
        id: format!("{wallet}-{market}-{}", at.timestamp()),
        market_id: market.to_string(),
        market_question: format!("Question for {market}?"),
        market_slug: market.to_string(),
        wallet_address: wallet.to_string(),
        side,
        price_cents: Decimal::from(price),
        shares: Decimal::from(notional * 100) / Decimal::from(price),
        notional_usd: Decimal::from(notional),
        timestamp: at,
        potential_return_pct: None,
    }
}

/// `count` history entries spread round-robin over `markets` markets, of
/// which the first `resolved` have an outcome and the first `won` of those
/// were winners.
#[allow(dead_code)]
pub fn make_history(
    count: usize,
    markets: usize,
    resolved: usize,
    won: usize,
    notional: i64,
) -> Vec<HistoryTrade> {
    (0..count)
        .map(|i| HistoryTrade {
            market_id: format!("hist_market_{}", i % markets.max(1)),
            side: Side::Buy,
            notional_usd: Decimal::from(notional),
            timestamp: base_time() - Duration::days(200) + Duration::hours(i as i64),
            outcome: if i < won {
                Some(TradeOutcome::Won)
            } else if i < resolved {
                Some(TradeOutcome::Lost)
            } else {
                None
            },
        })
        .collect()
}

#[allow(dead_code)]
pub fn make_market(id: &str, resolution: Option<DateTime<Utc>>) -> MarketContext {
    MarketContext {
        market_id: id.to_string(),
        question: Some(format!("Question for {id}?")),
        slug: Some(id.to_string()),
        resolution_time: resolution,
        ..MarketContext::default()
    }
}

#[allow(dead_code)]
pub fn make_input(
    trades: Vec<Trade>,
    histories: Vec<(&str, Vec<HistoryTrade>)>,
    markets: Vec<MarketContext>,
) -> ScanInput {
    ScanInput {
        trades,
        histories: histories
            .into_iter()
            .map(|(wallet, history)| (wallet.to_string(), history))
            .collect::<HashMap<_, _>>(),
        markets: markets.into_iter().map(|m| (m.market_id.clone(), m)).collect(),
        dropped: 0,
    }
}

/// Fresh wallet: 4 prior trades over 2 markets, then $32,000 at 7c six hours
/// before resolution.
#[allow(dead_code)]
pub fn fresh_insider_scenario() -> ScanInput {
    let wallet = "0x31a56e9E690c621eD21De08Cb559e9524Cdb8eD9";
    let trade = make_trade(wallet, "maduro_out", Side::Buy, 7, 32_000, base_time());
    let market = make_market("maduro_out", Some(base_time() + Duration::hours(6)));
    make_input(vec![trade], vec![(wallet, make_history(4, 2, 0, 0, 500))], vec![market])
}

/// Seasoned wallet: 158 trades over 25 markets, 48 of 50 resolved won,
/// $3.16M volume, then $50,000 at 4c a month before resolution.
#[allow(dead_code)]
pub fn veteran_winner_scenario() -> ScanInput {
    let wallet = "0x7a3f00000000000000000000000000000000beef";
    let trade = make_trade(wallet, "election", Side::Buy, 4, 50_000, base_time());
    let market = make_market("election", Some(base_time() + Duration::days(30)));
    make_input(
        vec![trade],
        vec![(wallet, make_history(158, 25, 50, 48, 20_000))],
        vec![market],
    )
}
