use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use super::stats::checked_sum;
use crate::models::{Alert, ScoreRecord, Severity, SignalKind};

/// How often one signal fired over a set of scored trades.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalStats {
    pub signal: SignalKind,
    pub times_triggered: usize,
    /// Mean score over the trades where the signal fired, zero if it never did.
    pub avg_score_when_triggered: Decimal,
    /// Fraction of scored trades, 0–1.
    pub trigger_rate: Decimal,
}

/// Score distribution over a batch, for tuning weights and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityStats {
    pub total_scanned: usize,
    pub alerts_generated: usize,
    pub alert_rate: Decimal,
    pub avg_score: Decimal,
    pub max_score: Decimal,
    pub min_score: Decimal,
    /// Most frequently triggered first.
    pub signal_breakdown: Vec<SignalStats>,
}

/// Markets ranked by how much suspicious flow they attracted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSummary {
    pub market_id: String,
    pub question: String,
    pub slug: String,
    pub alert_count: usize,
    pub suspicious_volume_usd: Decimal,
    pub max_severity: Severity,
    pub latest_alert: DateTime<Utc>,
}

fn ratio(part: usize, whole: usize) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(part as i64) / Decimal::from(whole as i64)
}

// ---------------------------------------------------------------------------
// Signal tuning
// ---------------------------------------------------------------------------

/// Summarise scored trades. Every signal kind that appears in the records
/// gets a row, including ones that never fired.
pub fn activity_stats(records: &[ScoreRecord]) -> ActivityStats {
    let mut fired: BTreeMap<SignalKind, Vec<Decimal>> = BTreeMap::new();
    for record in records {
        for signal in &record.signals {
            let scores = fired.entry(signal.signal).or_default();
            if signal.triggered() {
                scores.push(signal.score);
            }
        }
    }

    let total = records.len();
    let mut signal_breakdown: Vec<SignalStats> = fired
        .into_iter()
        .map(|(signal, scores)| {
            let avg = if scores.is_empty() {
                Decimal::ZERO
            } else {
                checked_sum(scores.iter().copied())
                    .map(|sum| sum / Decimal::from(scores.len() as i64))
                    .unwrap_or(Decimal::MAX)
            };
            SignalStats {
                signal,
                times_triggered: scores.len(),
                avg_score_when_triggered: avg.round_dp(1),
                trigger_rate: ratio(scores.len(), total).round_dp(4),
            }
        })
        .collect();
    signal_breakdown.sort_by(|a, b| b.times_triggered.cmp(&a.times_triggered));

    let scores: Vec<Decimal> = records.iter().map(|r| r.suspicion_score).collect();
    let alerts = records.iter().filter(|r| r.is_alert).count();
    let avg_score = if scores.is_empty() {
        Decimal::ZERO
    } else {
        checked_sum(scores.iter().copied())
            .map(|sum| sum / Decimal::from(scores.len() as i64))
            .unwrap_or(Decimal::MAX)
    };

    ActivityStats {
        total_scanned: total,
        alerts_generated: alerts,
        alert_rate: ratio(alerts, total).round_dp(4),
        avg_score: avg_score.round_dp(1),
        max_score: scores.iter().copied().max().unwrap_or_default(),
        min_score: scores.iter().copied().min().unwrap_or_default(),
        signal_breakdown,
    }
}

// ---------------------------------------------------------------------------
// Suspicious markets
// ---------------------------------------------------------------------------

/// Group alerts by market, order by alert count then suspicious volume
/// (both descending, market id breaks ties) and keep the top `limit`.
pub fn rank_markets(alerts: &[Alert], limit: usize) -> Vec<MarketSummary> {
    let mut markets: BTreeMap<&str, MarketSummary> = BTreeMap::new();

    for alert in alerts {
        let trade = &alert.trade;
        let summary = markets
            .entry(trade.market_id.as_str())
            .or_insert_with(|| MarketSummary {
                market_id: trade.market_id.clone(),
                question: trade.market_question.clone(),
                slug: trade.market_slug.clone(),
                alert_count: 0,
                suspicious_volume_usd: Decimal::ZERO,
                max_severity: alert.severity,
                latest_alert: alert.created_at,
            });

        summary.alert_count += 1;
        summary.suspicious_volume_usd = summary
            .suspicious_volume_usd
            .checked_add(trade.notional_usd)
            .unwrap_or(Decimal::MAX);
        summary.max_severity = summary.max_severity.max(alert.severity);
        summary.latest_alert = summary.latest_alert.max(alert.created_at);
    }

    let mut ranked: Vec<MarketSummary> = markets.into_values().collect();
    ranked.sort_by(|a, b| {
        b.alert_count
            .cmp(&a.alert_count)
            .then_with(|| b.suspicious_volume_usd.cmp(&a.suspicious_volume_usd))
            .then_with(|| a.market_id.cmp(&b.market_id))
    });
    ranked.truncate(limit);
    ranked
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Side, SignalResult, Trade, WalletProfile};
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 3, 12, 0, 0).unwrap()
    }

    fn make_trade(market: &str, notional: i64) -> Trade {
        Trade {
            id: format!("{market}-{notional}"),
            market_id: market.into(),
            market_question: format!("Question for {market}?"),
            market_slug: market.into(),
            wallet_address: "0xabc".into(),
            side: Side::Buy,
            price_cents: Decimal::from(7),
            shares: Decimal::from(notional * 100 / 7),
            notional_usd: Decimal::from(notional),
            timestamp: at(),
            potential_return_pct: None,
        }
    }

    fn make_record(fresh: i64, odds: i64, is_alert: bool) -> ScoreRecord {
        let trade = make_trade("m1", 1_000);
        let signals = vec![
            SignalResult::new(SignalKind::FreshWallet, Decimal::from(fresh), "", Decimal::from(10)),
            SignalResult::new(SignalKind::ExtremeOdds, Decimal::from(odds), "", Decimal::from(10)),
            SignalResult::quiet(SignalKind::Timing, "", Decimal::from(24)),
        ];
        let total = Decimal::from(fresh + odds);
        ScoreRecord {
            key: trade.key(),
            trade,
            signals,
            total_score: total,
            suspicion_score: total,
            raw_severity: Severity::Low,
            severity: is_alert.then_some(Severity::Low),
            insider_probability: Decimal::ZERO,
            is_alert,
        }
    }

    fn make_alert(market: &str, notional: i64, severity: Severity, minutes: i64) -> Alert {
        let trade = make_trade(market, notional);
        Alert {
            id: Uuid::nil(),
            key: trade.key(),
            wallet_profile: WalletProfile::empty("0xabc"),
            trade,
            signals: Vec::new(),
            suspicion_score: Decimal::from(50),
            severity,
            insider_probability: Decimal::new(5, 1),
            narrative: String::new(),
            cascade_spark: None,
            created_at: at() + Duration::minutes(minutes),
        }
    }

    #[test]
    fn test_activity_stats_breakdown() {
        let records = vec![
            make_record(30, 20, true),
            make_record(10, 0, false),
            make_record(0, 0, false),
            make_record(20, 20, true),
        ];
        let stats = activity_stats(&records);

        assert_eq!(stats.total_scanned, 4);
        assert_eq!(stats.alerts_generated, 2);
        assert_eq!(stats.alert_rate, Decimal::new(5, 1));
        assert_eq!(stats.max_score, Decimal::from(50));
        assert_eq!(stats.min_score, Decimal::ZERO);
        assert_eq!(stats.avg_score, Decimal::new(25, 0));

        let fresh = &stats.signal_breakdown[0];
        assert_eq!(fresh.signal, SignalKind::FreshWallet);
        assert_eq!(fresh.times_triggered, 3);
        assert_eq!(fresh.avg_score_when_triggered, Decimal::from(20));
        assert_eq!(fresh.trigger_rate, Decimal::new(75, 2));

        let timing = stats.signal_breakdown.iter().find(|s| s.signal == SignalKind::Timing).unwrap();
        assert_eq!(timing.times_triggered, 0);
        assert_eq!(timing.avg_score_when_triggered, Decimal::ZERO);
    }

    #[test]
    fn test_activity_stats_empty() {
        let stats = activity_stats(&[]);
        assert_eq!(stats.total_scanned, 0);
        assert_eq!(stats.alert_rate, Decimal::ZERO);
        assert!(stats.signal_breakdown.is_empty());
    }

    #[test]
    fn test_rank_markets_by_count_then_volume() {
        let alerts = vec![
            make_alert("quiet", 90_000, Severity::Critical, 0),
            make_alert("busy", 1_000, Severity::Low, 1),
            make_alert("busy", 2_000, Severity::High, 2),
            make_alert("mid", 5_000, Severity::Medium, 3),
        ];
        let ranked = rank_markets(&alerts, 10);

        let order: Vec<&str> = ranked.iter().map(|m| m.market_id.as_str()).collect();
        assert_eq!(order, vec!["busy", "quiet", "mid"]);

        let busy = &ranked[0];
        assert_eq!(busy.alert_count, 2);
        assert_eq!(busy.suspicious_volume_usd, Decimal::from(3_000));
        assert_eq!(busy.max_severity, Severity::High);
        assert_eq!(busy.latest_alert, at() + Duration::minutes(2));
    }

    #[test]
    fn test_rank_markets_limit() {
        let alerts = vec![
            make_alert("a", 1_000, Severity::Low, 0),
            make_alert("b", 2_000, Severity::Low, 0),
        ];
        let ranked = rank_markets(&alerts, 1);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].market_id, "b");
    }
}
