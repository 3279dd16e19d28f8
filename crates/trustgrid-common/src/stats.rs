//! Numeric utilities shared by the scoring and consensus engines
//!
//! All functions are total: empty inputs resolve to `0.0` rather than NaN.

/// Arithmetic mean, `0.0` for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance, `0.0` for an empty slice
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Clamp to the unit interval; NaN maps to `0.0`
#[inline]
pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Weighted mean of `(value, weight)` pairs, `None` when the weights sum to zero
pub fn weighted_mean<I>(pairs: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (sum, total_weight) = pairs
        .into_iter()
        .fold((0.0, 0.0), |(s, w), (value, weight)| {
            (s + value * weight, w + weight)
        });

    if total_weight == 0.0 {
        None
    } else {
        Some(sum / total_weight)
    }
}

/// Exponential decay: `score × factor^(days / half_life_days)`
///
/// Non-positive elapsed time or half-life leaves the score untouched.
pub fn temporal_decay(score: f64, factor: f64, days: f64, half_life_days: f64) -> f64 {
    if days <= 0.0 || half_life_days <= 0.0 {
        return score;
    }
    score * factor.powf(days / half_life_days)
}

/// Whether two values lie within `tolerance` of each other
#[inline]
pub fn within_tolerance(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}
