//! Ordinary least-squares line fit.
//!
//! Figures and reports show a plain linear trend next to Sen's slope, so we
//! solve the two-column problem
//!
//! ```text
//! minimize Σ (y_i - (a + b x_i))^2
//! ```
//!
//! with an SVD so a degenerate design (all `x` equal) is reported as `None`
//! instead of producing garbage.

use nalgebra::{DMatrix, DVector};

use crate::domain::LinearFit;

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    if svd.rank(1e-10) < x.ncols() {
        return None;
    }
    let beta = svd.solve(y, 1e-10).ok()?;
    beta.iter().all(|v| v.is_finite()).then_some(beta)
}

/// Fit `y = slope * x + intercept` and report R².
///
/// Needs at least two distinct `x` values.
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = x.len();
    if n < 2 || n != y.len() {
        return None;
    }

    // Center x to keep the design well conditioned for calendar years.
    let x_mean = x.iter().sum::<f64>() / n as f64;
    let mut design = DMatrix::<f64>::zeros(n, 2);
    for (i, &xi) in x.iter().enumerate() {
        design[(i, 0)] = 1.0;
        design[(i, 1)] = xi - x_mean;
    }
    let rhs = DVector::from_column_slice(y);
    let beta = solve_least_squares(&design, &rhs)?;

    let slope = beta[1];
    let intercept = beta[0] - slope * x_mean;

    let y_mean = y.iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let ss_res: f64 = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| (yi - (slope * xi + intercept)).powi(2))
        .sum();
    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 1.0 };

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn fit_line_on_calendar_years() {
        let years = [2015.0, 2016.0, 2017.0, 2018.0];
        let values = [0.60, 0.58, 0.56, 0.54];
        let fit = fit_line(&years, &values).unwrap();
        assert!((fit.slope + 0.02).abs() < 1e-10);
        assert!((fit.predict(2015.0) - 0.60).abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-10);
    }

    #[test]
    fn fit_line_rejects_degenerate_x() {
        assert!(fit_line(&[2020.0, 2020.0, 2020.0], &[0.1, 0.2, 0.3]).is_none());
        assert!(fit_line(&[2020.0], &[0.1]).is_none());
    }
}
