//! Sen's slope (Theil-Sen) estimator.
//!
//! The slope is the median of all pairwise slopes `(v[j] - v[i]) / (j - i)`.
//! That is O(n²) pairs: fine for a few dozen annual means, not for the daily
//! pixel series those means are built from.

use crate::domain::{MIN_TREND_POINTS, SensSlope};
use crate::stats::descriptive::{mean, median};

/// Estimate Sen's slope for an ordered series (index = time step).
///
/// Series shorter than 4 points return a zero slope and the mean as intercept.
pub fn sens_slope(values: &[f64]) -> SensSlope {
    let n = values.len();
    if n < MIN_TREND_POINTS {
        return SensSlope {
            slope_per_year: 0.0,
            intercept: mean(values),
        };
    }

    let mut slopes = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            slopes.push((values[j] - values[i]) / (j - i) as f64);
        }
    }

    let slope_per_year = median(&slopes).unwrap_or(f64::NAN);
    let median_index = (n as f64 - 1.0) / 2.0;
    let intercept = median(values).unwrap_or(f64::NAN) - slope_per_year * median_index;

    SensSlope {
        slope_per_year,
        intercept,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_series_returns_mean_intercept() {
        let s = sens_slope(&[0.2, 0.4, 0.6]);
        assert_eq!(s.slope_per_year, 0.0);
        assert!((s.intercept - 0.4).abs() < 1e-12);
    }

    #[test]
    fn unit_slopes() {
        let up = sens_slope(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert!((up.slope_per_year - 1.0).abs() < 1e-12);
        // median(values) = 4.5, median(index) = 3.5
        assert!((up.intercept - 1.0).abs() < 1e-12);

        let down = sens_slope(&[8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
        assert!((down.slope_per_year + 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_series_has_zero_slope() {
        let s = sens_slope(&[0.5; 5]);
        assert_eq!(s.slope_per_year, 0.0);
        assert!((s.intercept - 0.5).abs() < 1e-12);
    }

    #[test]
    fn robust_to_a_single_outlier() {
        let s = sens_slope(&[0.0, 1.0, 2.0, 30.0, 4.0, 5.0, 6.0]);
        assert!((s.slope_per_year - 1.0).abs() < 1e-12, "got {}", s.slope_per_year);
    }

    #[test]
    fn is_deterministic() {
        let values = [0.61, 0.55, 0.58, 0.52, 0.57, 0.49, 0.51];
        let (a, b) = (sens_slope(&values), sens_slope(&values));
        assert_eq!(a.slope_per_year.to_bits(), b.slope_per_year.to_bits());
        assert_eq!(a.intercept.to_bits(), b.intercept.to_bits());
    }
}
