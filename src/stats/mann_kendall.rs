//! Mann-Kendall monotonic trend test.
//!
//! The test is Kendall's rank correlation (tau-b) between the sample index and
//! the values, with a two-sided p-value:
//!
//! - **exact** null distribution when there are no ties and either `n <= 33`
//!   or the smaller of (discordant, total - discordant) is at most 1
//! - **asymptotic** normal approximation with tie-corrected variance otherwise
//!
//! The index stands in for time: callers pass one value per year, sorted.

use crate::domain::{MIN_TREND_POINTS, MannKendall, SIGNIFICANCE_LEVEL, TrendDirection};
use crate::stats::distributions::normal_sf;

/// Largest `n` for which the exact distribution is used when there are no ties.
const EXACT_MAX_N: usize = 33;

/// `n!` stops being representable as `f64` past this point.
const FACTORIAL_LIMIT: usize = 171;

/// Kendall tau-b and its two-sided p-value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KendallTau {
    pub tau: f64,
    pub p_value: f64,
}

/// Run the Mann-Kendall test on an ordered series.
///
/// Series shorter than 4 points, and series where every pair is tied
/// (constant values), return the `no_trend` sentinel.
pub fn mann_kendall(values: &[f64]) -> MannKendall {
    if values.len() < MIN_TREND_POINTS {
        return MannKendall::no_trend();
    }

    let index: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    let Some(KendallTau { tau, p_value }) = kendall_tau(&index, values) else {
        return MannKendall::no_trend();
    };

    let trend = if p_value < SIGNIFICANCE_LEVEL {
        if tau > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        }
    } else {
        TrendDirection::NoTrend
    };

    MannKendall { trend, p_value, tau }
}

/// Kendall tau-b between two equal-length sequences.
///
/// Returns `None` when the lengths differ, fewer than two points are given,
/// a value is NaN, or either sequence is entirely tied (tau-b undefined).
pub fn kendall_tau(x: &[f64], y: &[f64]) -> Option<KendallTau> {
    let n = x.len();
    if n != y.len() || n < 2 || x.iter().chain(y).any(|v| v.is_nan()) {
        return None;
    }

    let total = (n * (n - 1) / 2) as u64;
    let mut concordant = 0u64;
    let mut discordant = 0u64;
    for i in 0..n {
        for j in (i + 1)..n {
            if x[j] == x[i] || y[j] == y[i] {
                continue;
            }
            if (x[j] - x[i]).signum() == (y[j] - y[i]).signum() {
                concordant += 1;
            } else {
                discordant += 1;
            }
        }
    }

    let x_ties = TieCounts::of(x);
    let y_ties = TieCounts::of(y);
    if x_ties.pairs == total || y_ties.pairs == total {
        return None;
    }

    let con_minus_dis = concordant as f64 - discordant as f64;
    let tau = con_minus_dis
        / (((total - x_ties.pairs) as f64) * ((total - y_ties.pairs) as f64)).sqrt();
    let tau = tau.clamp(-1.0, 1.0);

    let no_ties = x_ties.pairs == 0 && y_ties.pairs == 0;
    let c = discordant.min(total - discordant);
    let p_value = if no_ties && (n <= EXACT_MAX_N || c <= 1) {
        exact_p_value(n, c)
    } else {
        asymptotic_p_value(n, con_minus_dis, &x_ties, &y_ties)
    };

    Some(KendallTau { tau, p_value })
}

/// Tie statistics for one sequence.
#[derive(Debug, Clone, Copy, Default)]
struct TieCounts {
    /// Σ t(t-1)/2: number of tied pairs.
    pairs: u64,
    /// Σ t(t-1)(t-2)
    v0: f64,
    /// Σ t(t-1)(2t+5)
    v1: f64,
}

impl TieCounts {
    fn of(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mut out = TieCounts::default();
        let mut i = 0;
        while i < sorted.len() {
            let mut j = i + 1;
            while j < sorted.len() && sorted[j] == sorted[i] {
                j += 1;
            }
            let t = (j - i) as u64;
            if t > 1 {
                let tf = t as f64;
                out.pairs += t * (t - 1) / 2;
                out.v0 += tf * (tf - 1.0) * (tf - 2.0);
                out.v1 += tf * (tf - 1.0) * (2.0 * tf + 5.0);
            }
            i = j;
        }
        out
    }
}

fn asymptotic_p_value(n: usize, con_minus_dis: f64, x: &TieCounts, y: &TieCounts) -> f64 {
    let nf = n as f64;
    let m = nf * (nf - 1.0);
    let mut var = (m * (2.0 * nf + 5.0) - x.v1 - y.v1) / 18.0
        + (2.0 * x.pairs as f64 * y.pairs as f64) / m;
    if n > 2 {
        var += x.v0 * y.v0 / (9.0 * m * (nf - 2.0));
    }
    if !(var > 0.0) {
        return 1.0;
    }
    let z = con_minus_dis / var.sqrt();
    (2.0 * normal_sf(z.abs())).clamp(0.0, 1.0)
}

/// Exact two-sided p-value from the distribution of inversions.
///
/// `c` is `min(discordant, total - discordant)`.
fn exact_p_value(n: usize, c: u64) -> f64 {
    let total = (n * (n - 1) / 2) as u64;
    let prob = if n <= 2 {
        1.0
    } else if c == 0 {
        if n < FACTORIAL_LIMIT { 2.0 / factorial(n) } else { 0.0 }
    } else if c == 1 {
        if n < FACTORIAL_LIMIT + 1 { 2.0 / factorial(n - 1) } else { 0.0 }
    } else if 2 * c == total {
        1.0
    } else {
        // counts[k] = number of permutations of 1..=j with exactly k inversions,
        // truncated at k = c; built up one element at a time.
        let c = c as usize;
        let mut counts = vec![0.0f64; c + 1];
        counts[0] = 1.0;
        counts[1] = 1.0;
        for j in 3..=n {
            for k in 1..=c {
                counts[k] += counts[k - 1];
            }
            if j <= c {
                for k in (j..=c).rev() {
                    counts[k] -= counts[k - j];
                }
            }
        }
        2.0 * counts.iter().sum::<f64>() / factorial(n)
    };
    prob.clamp(0.0, 1.0)
}

fn factorial(n: usize) -> f64 {
    (2..=n).fold(1.0, |acc, k| acc * k as f64)
}
