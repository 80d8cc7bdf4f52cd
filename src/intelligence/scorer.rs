use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::signals::{evaluate_all, SignalInput};
use super::stats::{checked_sum, unit};
use crate::config::DetectionConfig;
use crate::models::{short_id, Alert, ScoreRecord, Severity, SignalResult, TradeKey, WalletProfile};

/// Capped sum of signal scores: `min(100, Σ score)`.
///
/// Scores are non-negative, so adding a signal never lowers the result.
pub fn aggregate(signals: &[SignalResult]) -> Decimal {
    total(signals).min(Decimal::ONE_HUNDRED)
}

fn total(signals: &[SignalResult]) -> Decimal {
    checked_sum(signals.iter().map(|s| s.score.max(Decimal::ZERO))).unwrap_or(Decimal::MAX)
}

// ---------------------------------------------------------------------------
// Severity state machine
// ---------------------------------------------------------------------------

/// Tier from the score alone.
pub fn raw_tier(score: Decimal, config: &DetectionConfig) -> Severity {
    if score >= config.critical_score {
        Severity::Critical
    } else if score >= config.high_score {
        Severity::High
    } else if score >= config.medium_score {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Highest tier a trade of this size may carry. `None` forbids alerting.
pub fn notional_ceiling(notional: Decimal, config: &DetectionConfig) -> Option<Severity> {
    if notional < config.alert_min_notional {
        None
    } else if notional < config.medium_min_notional {
        Some(Severity::Low)
    } else if notional < config.high_min_notional {
        Some(Severity::Medium)
    } else if notional < config.critical_min_notional {
        Some(Severity::High)
    } else {
        Some(Severity::Critical)
    }
}

/// Apply the notional cap to a raw tier. Only ever demotes.
pub fn gate_severity(raw: Severity, notional: Decimal, config: &DetectionConfig) -> Option<Severity> {
    notional_ceiling(notional, config).map(|ceiling| raw.min(ceiling))
}

/// Display-only probability: half the normalised score, half a per-tier
/// anchor. Monotonic in the score since the tier is.
pub fn insider_probability(score: Decimal, config: &DetectionConfig) -> Decimal {
    let anchor = match raw_tier(score, config) {
        Severity::Low => Decimal::new(10, 2),
        Severity::Medium => Decimal::new(35, 2),
        Severity::High => Decimal::new(60, 2),
        Severity::Critical => Decimal::new(85, 2),
    };
    let normalised = unit(score / Decimal::ONE_HUNDRED);
    unit(Decimal::new(5, 1) * normalised + Decimal::new(5, 1) * anchor).round_dp(4)
}

// ---------------------------------------------------------------------------
// Per-trade scoring
// ---------------------------------------------------------------------------

/// Run every evaluator over one trade and classify the result.
pub fn score_trade(input: &SignalInput<'_>, config: &DetectionConfig) -> ScoreRecord {
    let signals = evaluate_all(input, config);
    score_signals(input, signals, config)
}

/// Classify an already-evaluated signal set.
pub fn score_signals(
    input: &SignalInput<'_>,
    signals: Vec<SignalResult>,
    config: &DetectionConfig,
) -> ScoreRecord {
    let trade = input.trade;
    let total_score = total(&signals);
    let suspicion_score = aggregate(&signals);
    let raw_severity = raw_tier(suspicion_score, config);
    let severity = gate_severity(raw_severity, trade.notional_usd, config);

    let is_alert = suspicion_score >= config.min_alert_score
        && severity.is_some_and(|s| s >= config.min_alert_severity);

    if !is_alert {
        tracing::debug!(
            wallet = %trade.wallet_address,
            market = %trade.market_id,
            score = %suspicion_score,
            notional = %trade.notional_usd,
            "Trade below alerting threshold"
        );
    }

    ScoreRecord {
        key: trade.key(),
        trade: trade.clone(),
        signals,
        total_score,
        suspicion_score,
        raw_severity,
        severity,
        insider_probability: insider_probability(suspicion_score, config),
        is_alert,
    }
}

// ---------------------------------------------------------------------------
// Alert assembly
// ---------------------------------------------------------------------------

/// Deterministic alert id from the trade key.
pub fn alert_id(key: &TradeKey) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("alert:{key}").as_bytes())
}

/// Turn an alerting record into an Alert. Returns `None` for records that
/// did not clear the gate. `now` is the cycle's clock, never read here.
pub fn build_alert(
    record: &ScoreRecord,
    profile: &WalletProfile,
    cascade_spark: Option<TradeKey>,
    now: DateTime<Utc>,
    config: &DetectionConfig,
) -> Option<Alert> {
    if !record.is_alert {
        return None;
    }
    let severity = record.severity?;

    Some(Alert {
        id: alert_id(&record.key),
        key: record.key.clone(),
        trade: record.trade.clone(),
        wallet_profile: profile.clone(),
        signals: record.signals.clone(),
        suspicion_score: record.suspicion_score,
        severity,
        insider_probability: record.insider_probability,
        narrative: build_narrative(record, profile, config),
        cascade_spark,
        created_at: now,
    })
}

/// Plain-language explanation of why a trade was flagged.
pub fn build_narrative(record: &ScoreRecord, profile: &WalletProfile, config: &DetectionConfig) -> String {
    let trade = &record.trade;
    let mut parts = Vec::new();

    if profile.total_trades < config.fresh_wallet_max_trades {
        parts.push(format!("A low-activity wallet ({} total trades)", profile.total_trades));
    } else {
        parts.push(format!("Wallet {}", short_id(&trade.wallet_address)));
    }

    parts.push(format!(
        "placed a ${} {} bet",
        trade.notional_usd.round_dp(0),
        trade.side
    ));

    if !trade.market_question.is_empty() {
        let question: String = trade.market_question.chars().take(60).collect();
        parts.push(format!("on '{question}'"));
    }

    match trade.potential_return() {
        Some(ret) if trade.price_cents < config.low_odds_cut_cents => parts.push(format!(
            "at just {}c ({}% potential return)",
            trade.price_cents.round_dp(1),
            ret.round_dp(0)
        )),
        _ => parts.push(format!("at {}c", trade.price_cents.round_dp(1))),
    }

    let mut narrative = parts.join(" ");

    let flagged: Vec<&str> = record
        .signals
        .iter()
        .filter(|s| s.triggered())
        .map(|s| s.signal.label())
        .collect();
    if !flagged.is_empty() {
        narrative.push_str(&format!(". Flagged for: {}", flagged.join(", ")));
    }

    if record.raw_severity != record.severity.unwrap_or(record.raw_severity) {
        narrative.push_str(&format!(
            ". Severity capped from {} by bet size",
            record.raw_severity
        ));
    }

    narrative
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
