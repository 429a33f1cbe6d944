//! Small descriptive-statistics helpers shared by the allocator and ratios.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (divides by n - 1). Zero for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    sample_covariance(values, values).sqrt()
}

/// Sample covariance (divides by n - 1). Zero for fewer than two pairs.
pub fn sample_covariance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (ma, mb) = (mean(&a[..n]), mean(&b[..n]));
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum::<f64>()
        / (n - 1) as f64
}

/// Simple percentage change between consecutive values.
///
/// `None` where either value is missing or the previous value is zero.
pub fn pct_change(prev: f64, next: f64) -> Option<f64> {
    if !prev.is_finite() || !next.is_finite() || prev == 0.0 {
        return None;
    }
    Some((next - prev) / prev)
}

/// `a / b`, or `None` when the denominator is zero or either side is missing.
pub fn safe_ratio(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) if b != 0.0 && a.is_finite() && b.is_finite() => Some(a / b),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_of_alternating() {
        // mean 0, squares sum to 4e-4, / 3
        let v = [0.01, -0.01, 0.01, -0.01];
        assert!((sample_std(&v) - (4e-4f64 / 3.0).sqrt()).abs() < 1e-15);
    }

    #[test]
    fn covariance_of_constant_is_zero() {
        assert_eq!(sample_covariance(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]), 0.0);
    }

    #[test]
    fn single_value_has_zero_spread() {
        assert_eq!(sample_std(&[3.0]), 0.0);
    }

    #[test]
    fn pct_change_guards() {
        assert_eq!(pct_change(0.0, 1.0), None);
        assert_eq!(pct_change(f64::NAN, 1.0), None);
        assert_eq!(pct_change(2.0, 3.0), Some(0.5));
    }

    #[test]
    fn ratio_zero_denominator() {
        assert_eq!(safe_ratio(Some(1.0), Some(0.0)), None);
        assert_eq!(safe_ratio(None, Some(2.0)), None);
        assert_eq!(safe_ratio(Some(1.0), Some(4.0)), Some(0.25));
    }
}
