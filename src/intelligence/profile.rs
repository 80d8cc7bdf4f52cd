use rust_decimal::Decimal;
use std::collections::HashSet;

use super::stats::checked_sum;
use crate::models::{HistoryTrade, TradeOutcome, WalletProfile};

/// Build a wallet profile from whatever history the data source supplied.
///
/// Empty history is not an error: it yields a zero-trade profile with no
/// win rate, which the fresh-wallet evaluator scores as maximal uncertainty.
/// The win rate only counts trades with a known outcome and stays `None`
/// when there are none.
pub fn build_wallet_profile(address: &str, history: &[HistoryTrade]) -> WalletProfile {
    if history.is_empty() {
        return WalletProfile::empty(address);
    }

    let unique_markets: HashSet<&str> = history.iter().map(|t| t.market_id.as_str()).collect();
    let total_volume_usd = checked_sum(history.iter().map(|t| t.notional_usd)).unwrap_or_else(|| {
        tracing::warn!(wallet = %address, "History volume overflowed, saturating");
        Decimal::MAX
    });

    let resolved: Vec<TradeOutcome> = history.iter().filter_map(|t| t.outcome).collect();
    let wins = resolved.iter().filter(|o| **o == TradeOutcome::Won).count();
    let win_rate = if resolved.is_empty() {
        None
    } else {
        Some(Decimal::from(wins as i64) / Decimal::from(resolved.len() as i64))
    };

    WalletProfile {
        address: address.to_string(),
        total_trades: history.len() as u32,
        unique_markets: unique_markets.len() as u32,
        total_volume_usd,
        win_rate,
        resolved_trades: resolved.len() as u32,
        first_seen_at: history.iter().map(|t| t.timestamp).min(),
        last_active_at: history.iter().map(|t| t.timestamp).max(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Side;
    use chrono::{Duration, Utc};

    fn make_history(market: &str, days_ago: i64, outcome: Option<TradeOutcome>) -> HistoryTrade {
        HistoryTrade {
            market_id: market.to_string(),
            side: Side::Buy,
            notional_usd: Decimal::from(1_000),
            timestamp: Utc::now() - Duration::days(days_ago),
            outcome,
        }
    }

    #[test]
    fn test_empty_history_degrades() {
        let profile = build_wallet_profile("0xnew", &[]);
        assert_eq!(profile.total_trades, 0);
        assert_eq!(profile.unique_markets, 0);
        assert_eq!(profile.win_rate, None);
        assert_eq!(profile.first_seen_at, None);
    }

    #[test]
    fn test_unique_markets_and_volume() {
        let history = vec![
            make_history("m1", 10, None),
            make_history("m1", 9, None),
            make_history("m2", 8, None),
        ];
        let profile = build_wallet_profile("0xabc", &history);
        assert_eq!(profile.total_trades, 3);
        assert_eq!(profile.unique_markets, 2);
        assert_eq!(profile.total_volume_usd, Decimal::from(3_000));
        assert!(profile.first_seen_at < profile.last_active_at);
    }

    #[test]
    fn test_win_rate_null_without_resolved_trades() {
        let history = vec![make_history("m1", 3, None), make_history("m2", 2, None)];
        let profile = build_wallet_profile("0xabc", &history);
        assert_eq!(profile.win_rate, None);
        assert_eq!(profile.resolved_trades, 0);
    }

    #[test]
    fn test_win_rate_from_resolved_only() {
        let history = vec![
            make_history("m1", 5, Some(TradeOutcome::Won)),
            make_history("m2", 4, Some(TradeOutcome::Won)),
            make_history("m3", 3, Some(TradeOutcome::Won)),
            make_history("m4", 2, Some(TradeOutcome::Lost)),
            make_history("m5", 1, None),
        ];
        let profile = build_wallet_profile("0xabc", &history);
        assert_eq!(profile.win_rate, Some(Decimal::new(75, 2)));
        assert_eq!(profile.resolved_trades, 4);
        assert_eq!(profile.total_trades, 5);
    }

    #[test]
    fn test_overflowing_history_volume_saturates() {
        let mut big = make_history("m1", 2, None);
        big.notional_usd = Decimal::MAX;
        let history = vec![big.clone(), big];
        let profile = build_wallet_profile("0xabc", &history);
        assert_eq!(profile.total_volume_usd, Decimal::MAX);
        assert_eq!(profile.total_trades, 2);
    }
}
