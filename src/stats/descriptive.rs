//! Descriptive statistics over small `f64` slices.
//!
//! Conventions follow what the downstream CSV consumers expect:
//! - `std` is the *sample* standard deviation (ddof = 1)
//! - `percentile` uses linear interpolation between closest ranks (R-7)

/// Arithmetic mean. `NaN` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1). `NaN` when fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (n as f64 - 1.0)).sqrt()
}

/// Sample variance (ddof = 1). `NaN` when fewer than two values.
pub fn sample_variance(values: &[f64]) -> f64 {
    let s = sample_std(values);
    s * s
}

/// Median (average of the two middle values for even lengths).
///
/// Returns `None` for an empty slice or when any value is NaN.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}

/// `p`-th percentile (`p` in `[0, 100]`) with linear interpolation.
///
/// Returns `None` for an empty slice, NaN input, or `p` out of range.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=100.0).contains(&p) || values.iter().any(|v| v.is_nan()) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let h = (sorted.len() as f64 - 1.0) * (p / 100.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let g = h - lo as f64;
    Some(sorted[lo] + g * (sorted[hi] - sorted[lo]))
}

/// Minimum and maximum of the finite values.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values.iter().filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if lo.is_finite() && hi.is_finite() { Some((lo, hi)) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[1.0, f64::NAN]), None);
    }

    #[test]
    fn sample_std_uses_ddof_one() {
        let s = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((s - 2.138089935299395).abs() < 1e-12, "got {s}");
        assert!(sample_std(&[1.0]).is_nan());
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&v, 0.0), Some(1.0));
        assert_eq!(percentile(&v, 100.0), Some(5.0));
        assert_eq!(percentile(&v, 50.0), Some(3.0));
        // h = 4 * 0.1 = 0.4 -> 1.0 + 0.4 * (2.0 - 1.0)
        let p10 = percentile(&v, 10.0).unwrap();
        assert!((p10 - 1.4).abs() < 1e-12);
        assert_eq!(percentile(&v, 101.0), None);
    }
}
