use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

/// Sum that gives up instead of overflowing.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

/// Arithmetic mean. Returns `None` for an empty sample or on overflow.
pub fn mean(samples: &[Decimal]) -> Option<Decimal> {
    if samples.is_empty() {
        return None;
    }
    let n = Decimal::from(samples.len() as i64);
    checked_sum(samples.iter().copied())?.checked_div(n)
}

/// Population standard deviation. `None` when the squared deviations do
/// not fit in a `Decimal`.
pub fn std_dev(samples: &[Decimal]) -> Option<Decimal> {
    let mean = mean(samples)?;
    let n = Decimal::from(samples.len() as i64);

    let squares = samples
        .iter()
        .map(|s| {
            let diff = s.checked_sub(mean)?;
            diff.checked_mul(diff)
        })
        .collect::<Option<Vec<Decimal>>>()?;

    checked_sum(squares)?.checked_div(n)?.sqrt()
}

/// Z-score of `value` against `baseline`.
///
/// `None` when the baseline has fewer than `min_samples` points or zero
/// spread: a flat or tiny baseline would otherwise produce an arbitrarily
/// large score.
pub fn z_score(value: Decimal, baseline: &[Decimal], min_samples: usize) -> Option<Decimal> {
    if baseline.len() < min_samples.max(2) {
        return None;
    }
    let mean = mean(baseline)?;
    let sd = std_dev(baseline)?;
    if sd.is_zero() {
        return None;
    }
    value.checked_sub(mean)?.checked_div(sd)
}

/// Clamp into [0, 1].
pub fn unit(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO).min(Decimal::ONE)
}
