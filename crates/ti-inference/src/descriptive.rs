//! Small descriptive statistics on clean (missing-free) slices.
//!
//! Every function returns `NaN` when the quantity is undefined for the input
//! (empty slice, fewer than two values for a variance) instead of failing, so
//! that a single degenerate replicate cannot abort a whole null distribution.

/// Arithmetic mean.
pub fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

/// Sum of values (0 for an empty slice).
pub fn sum(x: &[f64]) -> f64 {
    x.iter().sum()
}

/// Median; the average of the two middle values for an even count.
pub fn median(x: &[f64]) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    let mut v = x.to_vec();
    v.sort_by(f64::total_cmp);
    let mid = v.len() / 2;
    if v.len() % 2 == 1 { v[mid] } else { 0.5 * (v[mid - 1] + v[mid]) }
}

/// Sample variance (denominator `n - 1`).
pub fn variance(x: &[f64]) -> f64 {
    if x.len() < 2 {
        return f64::NAN;
    }
    let m = mean(x);
    x.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (x.len() - 1) as f64
}

/// Sample standard deviation (denominator `n - 1`).
pub fn std_dev(x: &[f64]) -> f64 {
    variance(x).sqrt()
}

/// Quantile for sorted data via linear interpolation (R type 7).
///
/// - `q=0` returns min
/// - `q=1` returns max
/// - empty input returns `NaN`
pub fn quantile_linear_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let i = pos.floor() as usize;
    let j = pos.ceil() as usize;
    if i == j {
        return sorted[i];
    }
    let t = pos - i as f64;
    (1.0 - t) * sorted[i] + t * sorted[j]
}
