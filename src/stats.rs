//! Statistical utility functions shared across modules
//!
//! All helpers ignore non-finite entries, so a missing cell (stored as NaN in
//! an expression matrix) never contaminates a group summary.

/// Finite values of a slice, in order
pub fn finite_values(x: &[f64]) -> Vec<f64> {
    x.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Arithmetic mean over the finite entries; NaN when there are none
pub fn finite_mean(x: &[f64]) -> f64 {
    let (sum, n) = x
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Sample variance (n - 1 denominator) over the finite entries
///
/// Returns NaN when fewer than two finite values are present.
pub fn finite_variance(x: &[f64]) -> f64 {
    let values = finite_values(x);
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// Sample standard deviation (n - 1 denominator) over the finite entries
pub fn finite_std(x: &[f64]) -> f64 {
    finite_variance(x).sqrt()
}
