use chrono::Duration;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::stats::{checked_sum, mean};
use crate::config::DetectionConfig;
use crate::models::{Cascade, MarketContext, Trade, TradeKey};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Expected market volume over one cascade window.
///
/// Mean of the daily history when it has enough samples, otherwise the
/// trailing 24h volume, scaled down to the window length. `None` when the
/// market has neither.
pub fn baseline_volume(market: &MarketContext, config: &DetectionConfig) -> Option<Decimal> {
    let daily = if market.volume_history_usd.len() >= config.volume_baseline_min_samples.max(1) {
        mean(&market.volume_history_usd)
    } else {
        market.volume_24h_usd
    }?;

    let baseline = daily
        .checked_mul(Decimal::from(config.cascade_window_minutes))?
        .checked_div(Decimal::from(MINUTES_PER_DAY))?;
    (baseline > Decimal::ZERO).then_some(baseline)
}

/// Find spark trades: a trade followed within `cascade_window_minutes` by a
/// same-side burst far above the market's normal volume.
///
/// Markets are scanned in time order. A trade already claimed as a follower
/// is never promoted to a spark. The result does not depend on input order.
pub fn detect_cascades(
    trades: &[Trade],
    markets: &HashMap<String, MarketContext>,
    config: &DetectionConfig,
) -> Vec<Cascade> {
    let window = Duration::minutes(config.cascade_window_minutes);

    let mut by_market: BTreeMap<&str, Vec<&Trade>> = BTreeMap::new();
    for trade in trades {
        by_market.entry(trade.market_id.as_str()).or_default().push(trade);
    }

    let mut cascades = Vec::new();

    for (market_id, mut market_trades) in by_market {
        if market_trades.len() <= config.cascade_min_followers {
            continue;
        }
        let Some(baseline) = markets.get(market_id).and_then(|m| baseline_volume(m, config)) else {
            tracing::debug!(market = %market_id, "No volume baseline, skipping cascade scan");
            continue;
        };

        market_trades.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.key().cmp(&b.key())));

        let mut claimed: HashSet<TradeKey> = HashSet::new();

        for (pos, spark) in market_trades.iter().enumerate() {
            let spark_key = spark.key();
            if claimed.contains(&spark_key) {
                continue;
            }

            let window_end = spark.timestamp + window;
            let in_window: Vec<&Trade> = market_trades[pos + 1..]
                .iter()
                .take_while(|t| t.timestamp <= window_end)
                .copied()
                .collect();
            if in_window.is_empty() {
                continue;
            }

            let followers: Vec<&Trade> = in_window
                .iter()
                .filter(|t| t.side == spark.side && !claimed.contains(&t.key()))
                .copied()
                .collect();

            if followers.len() < config.cascade_min_followers {
                continue;
            }

            let same_side_ratio =
                Decimal::from(followers.len() as i64) / Decimal::from(in_window.len() as i64);
            if same_side_ratio < config.cascade_min_same_side_ratio {
                continue;
            }

            let Some(follower_volume) = checked_sum(followers.iter().map(|t| t.notional_usd)) else {
                continue;
            };
            let Some(volume_ratio) = follower_volume.checked_div(baseline) else {
                tracing::debug!(market = %market_id, "Volume ratio overflowed, skipping spark");
                continue;
            };
            if volume_ratio < config.cascade_volume_multiple {
                continue;
            }

            let follower_keys: Vec<TradeKey> = followers.iter().map(|t| t.key()).collect();
            claimed.insert(spark_key.clone());
            claimed.extend(follower_keys.iter().cloned());

            tracing::info!(
                market = %market_id,
                wallet = %spark.wallet_address,
                side = %spark.side,
                followers = follower_keys.len(),
                volume_ratio = %volume_ratio.round_dp(2),
                "Cascade spark detected"
            );

            cascades.push(Cascade {
                market_id: market_id.to_string(),
                side: spark.side,
                spark: spark_key,
                spark_trade_id: spark.id.clone(),
                spark_wallet: spark.wallet_address.clone(),
                spark_timestamp: spark.timestamp,
                followers: follower_keys,
                follower_volume_usd: follower_volume,
                baseline_volume_usd: baseline.round_dp(2),
                volume_ratio: volume_ratio.round_dp(4),
                window_end,
            });
        }
    }

    cascades
}

/// Follower key → spark key, for attaching provenance to alerts.
pub fn spark_links(cascades: &[Cascade]) -> HashMap<TradeKey, TradeKey> {
    cascades
        .iter()
        .flat_map(|c| c.followers.iter().map(move |f| (f.clone(), c.spark.clone())))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
