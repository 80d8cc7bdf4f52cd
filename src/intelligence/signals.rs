use chrono::Duration;
use rust_decimal::Decimal;

use super::stats::{unit, z_score};
use crate::config::DetectionConfig;
use crate::models::{MarketContext, SignalKind, SignalResult, Trade, WalletProfile};

/// Everything an evaluator may look at for one trade.
#[derive(Debug, Clone, Copy)]
pub struct SignalInput<'a> {
    pub trade: &'a Trade,
    pub profile: &'a WalletProfile,
    pub market: &'a MarketContext,
}

pub type Evaluator = fn(&SignalInput<'_>, &DetectionConfig) -> SignalResult;

/// All evaluators in report order. None depends on another's output.
pub const EVALUATORS: [Evaluator; 7] = [
    fresh_wallet,
    position_size,
    extreme_odds,
    market_diversity,
    volume_spike,
    win_rate_anomaly,
    timing,
];

pub fn evaluate_all(input: &SignalInput<'_>, config: &DetectionConfig) -> Vec<SignalResult> {
    EVALUATORS.iter().map(|evaluate| evaluate(input, config)).collect()
}

fn half() -> Decimal {
    Decimal::new(5, 1)
}

fn is_extreme_price(price: Decimal, config: &DetectionConfig) -> bool {
    price < config.low_odds_cut_cents || price > config.high_odds_cut_cents
}

// ---------------------------------------------------------------------------
// Signal 1: Fresh Wallet
// ---------------------------------------------------------------------------

/// Little history, or history spread over almost no markets.
///
/// Full weight at or below `fresh_wallet_full_score_trades`, fading linearly
/// to zero at `fresh_wallet_max_trades`. A wallet in fewer than
/// `fresh_wallet_min_markets` markets also triggers, proportionally to the
/// shortfall. The larger component wins.
pub fn fresh_wallet(input: &SignalInput<'_>, config: &DetectionConfig) -> SignalResult {
    let profile = input.profile;
    let weight = config.fresh_wallet_weight;
    let max_trades = config.fresh_wallet_max_trades;
    let min_markets = config.fresh_wallet_min_markets;
    let threshold = Decimal::from(max_trades);

    let trade_component = if profile.total_trades <= config.fresh_wallet_full_score_trades {
        weight
    } else if profile.total_trades < max_trades {
        weight * Decimal::from(max_trades - profile.total_trades)
            / Decimal::from(max_trades - config.fresh_wallet_full_score_trades)
    } else {
        Decimal::ZERO
    };

    let market_component = if profile.unique_markets < min_markets {
        weight * Decimal::from(min_markets - profile.unique_markets) / Decimal::from(min_markets)
    } else {
        Decimal::ZERO
    };

    let score = trade_component.max(market_component).min(weight);
    let details = format!(
        "{} trades, {} markets",
        profile.total_trades, profile.unique_markets
    );

    if score.is_zero() {
        return SignalResult::quiet(SignalKind::FreshWallet, details, threshold);
    }

    let details = match profile.first_seen_at {
        Some(first) => format!("{details}, first seen {}", first.format("%Y-%m-%d")),
        None => format!("{details}, no prior history"),
    };
    SignalResult::new(SignalKind::FreshWallet, score, details, threshold)
}

// ---------------------------------------------------------------------------
// Signal 2: Position Size / Whale
// ---------------------------------------------------------------------------

/// Whale-sized bet. When market liquidity is known, a bonus scales with the
/// bet's share of it.
pub fn position_size(input: &SignalInput<'_>, config: &DetectionConfig) -> SignalResult {
    let notional = input.trade.notional_usd;
    let threshold = config.whale_threshold_usd;

    if notional < threshold {
        return SignalResult::quiet(
            SignalKind::PositionSize,
            format!("${}", notional.round_dp(0)),
            threshold,
        );
    }

    let mut score = config.position_size_weight;
    let mut details = format!("${} whale-sized bet", notional.round_dp(0));

    if let Some(multiple) = input.profile.avg_trade_usd().and_then(|avg| notional.checked_div(avg)) {
        if multiple > Decimal::ONE {
            details.push_str(&format!(", {}x wallet average", multiple.round_dp(1)));
        }
    }

    if let Some(liquidity) = input.market.liquidity_usd.filter(|l| *l > Decimal::ZERO) {
        // A share too large to represent dwarfs the book: full bonus.
        let share = notional.checked_div(liquidity);
        let saturation = match share {
            Some(share) if config.liquidity_share_full > Decimal::ZERO => share
                .checked_div(config.liquidity_share_full)
                .map_or(Decimal::ONE, unit),
            _ => Decimal::ONE,
        };
        score += config.liquidity_bonus_weight * saturation;
        match share.and_then(|s| s.checked_mul(Decimal::ONE_HUNDRED)) {
            Some(pct) => details.push_str(&format!(", {}% of market liquidity", pct.round_dp(1))),
            None => details.push_str(", far beyond market liquidity"),
        }
    }

    SignalResult::new(SignalKind::PositionSize, score, details, threshold)
}

// ---------------------------------------------------------------------------
// Signal 3: Extreme Odds
// ---------------------------------------------------------------------------

/// Far-tail bet on either side. Half weight at the cut, rising linearly to
/// full weight within `extreme_odds_full_margin_cents` of 0 or 100.
pub fn extreme_odds(input: &SignalInput<'_>, config: &DetectionConfig) -> SignalResult {
    let price = input.trade.price_cents;
    let margin = config.extreme_odds_full_margin_cents;

    let (distance, cut_distance, threshold) = if price < config.low_odds_cut_cents {
        (price, config.low_odds_cut_cents, config.low_odds_cut_cents)
    } else if price > config.high_odds_cut_cents {
        (
            Decimal::ONE_HUNDRED - price,
            Decimal::ONE_HUNDRED - config.high_odds_cut_cents,
            config.high_odds_cut_cents,
        )
    } else {
        return SignalResult::quiet(
            SignalKind::ExtremeOdds,
            format!("{}c", price.round_dp(1)),
            config.low_odds_cut_cents,
        );
    };

    let span = cut_distance - margin;
    let extremity = if distance <= margin || span <= Decimal::ZERO {
        Decimal::ONE
    } else {
        unit((cut_distance - distance) / span)
    };
    let score = config.extreme_odds_weight * (half() + half() * extremity);

    let details = match input.trade.potential_return() {
        Some(ret) => format!("{}c ({}% potential return)", price.round_dp(1), ret.round_dp(0)),
        None => format!("{}c", price.round_dp(1)),
    };

    SignalResult::new(SignalKind::ExtremeOdds, score, details, threshold)
}

// ---------------------------------------------------------------------------
// Signal 4: Market Diversity
// ---------------------------------------------------------------------------

/// Trading concentrated in few markets. Inverse in `unique_markets`,
/// saturating at `diversity_full_markets`.
pub fn market_diversity(input: &SignalInput<'_>, config: &DetectionConfig) -> SignalResult {
    let profile = input.profile;
    let unique = profile.unique_markets;
    let threshold = Decimal::from(config.max_unique_markets_suspicious);
    let details = format!("{} markets over {} trades", unique, profile.total_trades);

    if unique == 0 || unique > config.max_unique_markets_suspicious {
        return SignalResult::quiet(SignalKind::MarketDiversity, details, threshold);
    }

    let concentration =
        unit(Decimal::from(config.diversity_full_markets) / Decimal::from(unique));
    let score = config.market_diversity_weight * concentration;

    SignalResult::new(SignalKind::MarketDiversity, score, details, threshold)
}

// ---------------------------------------------------------------------------
// Signal 5: Volume Spike
// ---------------------------------------------------------------------------

/// Market 24h volume against its daily baseline. Suppressed when the
/// baseline is too short or flat.
pub fn volume_spike(input: &SignalInput<'_>, config: &DetectionConfig) -> SignalResult {
    let threshold = config.volume_spike_zscore;
    let baseline = &input.market.volume_history_usd;

    let Some(current) = input.market.volume_24h_usd else {
        return SignalResult::quiet(SignalKind::VolumeSpike, "24h volume unknown", threshold);
    };

    let Some(z) = z_score(current, baseline, config.volume_baseline_min_samples) else {
        return SignalResult::quiet(
            SignalKind::VolumeSpike,
            format!("insufficient baseline ({} samples)", baseline.len()),
            threshold,
        );
    };

    let details = format!("z-score {}", z.round_dp(2));
    if z < threshold {
        return SignalResult::quiet(SignalKind::VolumeSpike, details, threshold);
    }

    let strength = if threshold > Decimal::ZERO {
        z.checked_div(threshold * Decimal::TWO).map_or(Decimal::ONE, unit)
    } else {
        Decimal::ONE
    };
    let score = config.volume_spike_weight * strength;

    SignalResult::new(SignalKind::VolumeSpike, score, details, threshold)
}

// ---------------------------------------------------------------------------
// Signal 6: Win Rate Anomaly
// ---------------------------------------------------------------------------

/// Unusually successful wallet, once enough trades have resolved for the
/// rate to mean something.
pub fn win_rate_anomaly(input: &SignalInput<'_>, config: &DetectionConfig) -> SignalResult {
    let profile = input.profile;
    let threshold = config.win_rate_suspicious_threshold;

    let Some(rate) = profile.win_rate else {
        return SignalResult::quiet(SignalKind::WinRateAnomaly, "no resolved trades", threshold);
    };

    let pct = (rate * Decimal::ONE_HUNDRED).round_dp(0);
    let details = format!("{}% over {} resolved trades", pct, profile.resolved_trades);

    if profile.resolved_trades < config.win_rate_min_resolved {
        return SignalResult::quiet(
            SignalKind::WinRateAnomaly,
            format!("{details} (need {})", config.win_rate_min_resolved),
            threshold,
        );
    }

    let score = if rate >= config.win_rate_suspicious_threshold {
        config.win_rate_weight
    } else if rate >= config.win_rate_elevated_threshold {
        config.win_rate_weight * Decimal::new(4, 1)
    } else {
        Decimal::ZERO
    };

    SignalResult::new(SignalKind::WinRateAnomaly, score, details, threshold)
}

// ---------------------------------------------------------------------------
// Signal 7: Timing
// ---------------------------------------------------------------------------

/// Bet placed close to the market's known or estimated resolution. Full
/// proximity within `timing_full_hours`, fading to zero at
/// `timing_window_hours`; halved unless the price is extreme.
pub fn timing(input: &SignalInput<'_>, config: &DetectionConfig) -> SignalResult {
    let threshold = Decimal::from(config.timing_window_hours);

    let Some(resolution) = input.market.resolution_time else {
        return SignalResult::quiet(SignalKind::Timing, "resolution time unknown", threshold);
    };

    let remaining = resolution - input.trade.timestamp;
    if remaining <= Duration::zero() {
        return SignalResult::quiet(SignalKind::Timing, "placed after resolution", threshold);
    }

    let minutes = remaining.num_minutes();
    let window = config.timing_window_hours * 60;
    let full = config.timing_full_hours * 60;
    let hours = (Decimal::from(minutes) / Decimal::from(60)).round_dp(1);
    let details = format!("{hours}h before resolution");

    if minutes >= window {
        return SignalResult::quiet(SignalKind::Timing, details, threshold);
    }

    let proximity = if minutes <= full {
        Decimal::ONE
    } else {
        Decimal::from(window - minutes) / Decimal::from(window - full)
    };
    let odds_factor = if is_extreme_price(input.trade.price_cents, config) {
        Decimal::ONE
    } else {
        half()
    };
    let score = config.timing_weight * proximity * odds_factor;

    SignalResult::new(SignalKind::Timing, score, details, threshold)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Side;
    use chrono::{TimeZone, Utc};

    fn make_trade(price: i64, notional: i64) -> Trade {
        Trade {
            id: "t1".into(),
            market_id: "market_1".into(),
            market_question: "Will it happen?".into(),
            market_slug: "will-it-happen".into(),
            wallet_address: "0xabc".into(),
            side: Side::Buy,
            price_cents: Decimal::from(price),
            shares: Decimal::from(notional * 100 / price.max(1)),
            notional_usd: Decimal::from(notional),
            timestamp: Utc.with_ymd_and_hms(2026, 1, 3, 12, 0, 0).unwrap(),
            potential_return_pct: None,
        }
    }

    fn make_profile(trades: u32, markets: u32) -> WalletProfile {
        WalletProfile {
            total_trades: trades,
            unique_markets: markets,
            total_volume_usd: Decimal::from(trades as i64 * 1_000),
            ..WalletProfile::empty("0xabc")
        }
    }

    fn run(
        evaluator: Evaluator,
        trade: &Trade,
        profile: &WalletProfile,
        market: &MarketContext,
    ) -> SignalResult {
        let input = SignalInput { trade, profile, market };
        evaluator(&input, &DetectionConfig::default())
    }

    #[test]
    fn test_fresh_wallet_full_weight_for_few_trades() {
        let trade = make_trade(50, 1_000);
        let market = MarketContext::unknown("market_1");
        let result = run(fresh_wallet, &trade, &make_profile(4, 2), &market);
        assert_eq!(result.score, Decimal::from(30));
        assert!(result.triggered());
    }

    #[test]
    fn test_fresh_wallet_scales_between_thresholds() {
        let trade = make_trade(50, 1_000);
        let market = MarketContext::unknown("market_1");
        // 7 trades: (10 - 7) / (10 - 5) = 0.6 of 30
        let result = run(fresh_wallet, &trade, &make_profile(7, 4), &market);
        assert_eq!(result.score, Decimal::from(18));
    }

    #[test]
    fn test_fresh_wallet_empty_history_is_maximal() {
        let trade = make_trade(50, 1_000);
        let market = MarketContext::unknown("market_1");
        let result = run(fresh_wallet, &trade, &WalletProfile::empty("0xabc"), &market);
        assert_eq!(result.score, Decimal::from(30));
        assert!(result.details.contains("no prior history"));
    }

    #[test]
    fn test_fresh_wallet_quiet_for_established_wallet() {
        let trade = make_trade(50, 1_000);
        let market = MarketContext::unknown("market_1");
        let result = run(fresh_wallet, &trade, &make_profile(158, 25), &market);
        assert!(!result.triggered());
    }

    #[test]
    fn test_fresh_wallet_single_market_history() {
        let trade = make_trade(50, 1_000);
        let market = MarketContext::unknown("market_1");
        // 40 trades all in one market: market component (2 - 1) / 2 of 30
        let result = run(fresh_wallet, &trade, &make_profile(40, 1), &market);
        assert_eq!(result.score, Decimal::from(15));
    }

    #[test]
    fn test_position_size_threshold() {
        let market = MarketContext::unknown("market_1");
        let profile = make_profile(4, 2);
        assert!(!run(position_size, &make_trade(50, 4_999), &profile, &market).triggered());
        let whale = run(position_size, &make_trade(50, 32_000), &profile, &market);
        assert_eq!(whale.score, Decimal::from(25));
        assert!(whale.details.contains("wallet average"));
    }

    #[test]
    fn test_position_size_liquidity_bonus() {
        let market = MarketContext {
            liquidity_usd: Some(Decimal::from(100_000)),
            ..MarketContext::unknown("market_1")
        };
        // 5% of liquidity, half of the 10% saturation: +5
        let result = run(position_size, &make_trade(50, 5_000), &make_profile(4, 2), &market);
        assert_eq!(result.score, Decimal::from(30));
    }

    #[test]
    fn test_position_size_ignores_zero_liquidity() {
        let market = MarketContext {
            liquidity_usd: Some(Decimal::ZERO),
            ..MarketContext::unknown("market_1")
        };
        let result = run(position_size, &make_trade(50, 6_000), &make_profile(4, 2), &market);
        assert_eq!(result.score, Decimal::from(25));
    }

    #[test]
    fn test_position_size_dust_liquidity_does_not_overflow() {
        // $1T against 1e-20 of liquidity: the share itself is unrepresentable.
        let market = MarketContext {
            liquidity_usd: Some(Decimal::new(1, 20)),
            ..MarketContext::unknown("market_1")
        };
        let mut trade = make_trade(50, 1_000);
        trade.notional_usd = crate::models::amount_limit();

        let result = run(position_size, &trade, &make_profile(4, 2), &market);
        assert_eq!(result.score, Decimal::from(35));
        assert!(result.details.contains("far beyond market liquidity"));
    }

    #[test]
    fn test_position_size_dust_wallet_average() {
        let market = MarketContext::unknown("market_1");
        let profile = WalletProfile {
            total_trades: 1,
            unique_markets: 1,
            total_volume_usd: Decimal::new(1, 27),
            ..WalletProfile::empty("0xabc")
        };
        let mut trade = make_trade(50, 1_000);
        trade.notional_usd = crate::models::amount_limit();

        let result = run(position_size, &trade, &profile, &market);
        assert_eq!(result.score, Decimal::from(25));
        assert!(!result.details.contains("wallet average"));
    }

    #[test]
    fn test_volume_spike_overflowing_baseline_is_quiet() {
        let trade = make_trade(50, 1_000);
        let market = MarketContext {
            volume_24h_usd: Some(Decimal::ONE),
            volume_history_usd: vec![Decimal::from(1_000_000_000_000_000i64), Decimal::ZERO, Decimal::ZERO],
            ..MarketContext::unknown("market_1")
        };
        let result = run(volume_spike, &trade, &make_profile(4, 2), &market);
        assert!(!result.triggered());
    }

    #[test]
    fn test_extreme_odds_tails() {
        let market = MarketContext::unknown("market_1");
        let profile = make_profile(4, 2);
        assert_eq!(run(extreme_odds, &make_trade(7, 1_000), &profile, &market).score, Decimal::from(20));
        assert_eq!(run(extreme_odds, &make_trade(15, 1_000), &profile, &market).score, Decimal::from(15));
        assert_eq!(run(extreme_odds, &make_trade(95, 1_000), &profile, &market).score, Decimal::from(20));
        assert!(!run(extreme_odds, &make_trade(50, 1_000), &profile, &market).triggered());
    }

    #[test]
    fn test_extreme_odds_symmetric() {
        let market = MarketContext::unknown("market_1");
        let profile = make_profile(4, 2);
        let low = run(extreme_odds, &make_trade(14, 1_000), &profile, &market);
        let high = run(extreme_odds, &make_trade(86, 1_000), &profile, &market);
        assert_eq!(low.score, high.score);
    }

    #[test]
    fn test_market_diversity_inverse() {
        let trade = make_trade(50, 1_000);
        let market = MarketContext::unknown("market_1");
        assert_eq!(run(market_diversity, &trade, &make_profile(4, 2), &market).score, Decimal::from(15));
        assert_eq!(
            run(market_diversity, &trade, &make_profile(158, 25), &market).score,
            Decimal::new(18, 1)
        );
        assert!(!run(market_diversity, &trade, &make_profile(300, 31), &market).triggered());
        assert!(!run(market_diversity, &trade, &make_profile(0, 0), &market).triggered());
    }

    #[test]
    fn test_volume_spike_requires_baseline() {
        let trade = make_trade(50, 1_000);
        let profile = make_profile(4, 2);
        let market = MarketContext {
            volume_24h_usd: Some(Decimal::from(1_000_000)),
            volume_history_usd: vec![Decimal::from(10_000), Decimal::from(12_000)],
            ..MarketContext::unknown("market_1")
        };
        let result = run(volume_spike, &trade, &profile, &market);
        assert!(!result.triggered());
        assert!(result.details.contains("insufficient baseline"));
    }

    #[test]
    fn test_volume_spike_detected() {
        let trade = make_trade(50, 1_000);
        let profile = make_profile(4, 2);
        let market = MarketContext {
            volume_24h_usd: Some(Decimal::from(100_000)),
            volume_history_usd: [9_000, 10_000, 11_000, 10_000, 9_000, 11_000]
                .iter()
                .map(|v| Decimal::from(*v))
                .collect(),
            ..MarketContext::unknown("market_1")
        };
        let result = run(volume_spike, &trade, &profile, &market);
        assert_eq!(result.score, Decimal::from(30));
    }

    #[test]
    fn test_win_rate_needs_sample() {
        let trade = make_trade(50, 1_000);
        let market = MarketContext::unknown("market_1");
        let lucky = WalletProfile {
            win_rate: Some(Decimal::ONE),
            resolved_trades: 1,
            ..make_profile(1, 1)
        };
        assert!(!run(win_rate_anomaly, &trade, &lucky, &market).triggered());

        let sharp = WalletProfile {
            win_rate: Some(Decimal::new(96, 2)),
            resolved_trades: 50,
            ..make_profile(158, 25)
        };
        assert_eq!(run(win_rate_anomaly, &trade, &sharp, &market).score, Decimal::from(25));
    }

    #[test]
    fn test_win_rate_null_is_not_zero() {
        let trade = make_trade(50, 1_000);
        let market = MarketContext::unknown("market_1");
        let result = run(win_rate_anomaly, &trade, &make_profile(20, 5), &market);
        assert!(!result.triggered());
        assert_eq!(result.details, "no resolved trades");
    }

    #[test]
    fn test_timing_near_resolution_beats_far() {
        let trade = make_trade(7, 32_000);
        let profile = make_profile(4, 2);
        let near = MarketContext {
            resolution_time: Some(trade.timestamp + Duration::hours(6)),
            ..MarketContext::unknown("market_1")
        };
        let far = MarketContext {
            resolution_time: Some(trade.timestamp + Duration::days(30)),
            ..MarketContext::unknown("market_1")
        };
        let near_score = run(timing, &trade, &profile, &near).score;
        let far_score = run(timing, &trade, &profile, &far).score;
        assert_eq!(near_score, Decimal::from(10));
        assert_eq!(far_score, Decimal::ZERO);
    }

    #[test]
    fn test_timing_halved_at_normal_odds() {
        let trade = make_trade(50, 32_000);
        let market = MarketContext {
            resolution_time: Some(trade.timestamp + Duration::hours(6)),
            ..MarketContext::unknown("market_1")
        };
        assert_eq!(run(timing, &trade, &make_profile(4, 2), &market).score, Decimal::from(5));
    }

    #[test]
    fn test_timing_missing_metadata_is_zero() {
        let trade = make_trade(7, 32_000);
        let market = MarketContext::unknown("market_1");
        assert!(!run(timing, &trade, &make_profile(4, 2), &market).triggered());
    }

    #[test]
    fn test_evaluate_all_emits_every_signal() {
        let trade = make_trade(50, 1_000);
        let profile = make_profile(4, 2);
        let market = MarketContext::unknown("market_1");
        let input = SignalInput { trade: &trade, profile: &profile, market: &market };
        let results = evaluate_all(&input, &DetectionConfig::default());
        assert_eq!(results.len(), EVALUATORS.len());
        assert!(results.iter().all(|r| r.score >= Decimal::ZERO));
    }
}
