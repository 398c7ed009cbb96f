//! Trend statistics: Mann-Kendall + Sen's slope + derived change figures.

use crate::domain::{Significance, TrendStatistics};
use crate::stats::StatsError;
use crate::stats::mann_kendall::mann_kendall;
use crate::stats::sens_slope::sens_slope;

/// Summarize the trend of an annual series.
///
/// `years` only feeds the reported `period`; slope math uses index position.
/// Percent figures divide by `values[0]` (see `TrendStatistics`).
pub fn trend_statistics(values: &[f64], years: &[i32]) -> Result<TrendStatistics, StatsError> {
    if values.len() != years.len() {
        return Err(StatsError::LengthMismatch {
            values: values.len(),
            years: years.len(),
        });
    }
    let (Some(&first), Some(&last)) = (values.first(), values.last()) else {
        return Err(StatsError::EmptySeries);
    };
    // Non-empty and equal length, so these exist.
    let first_year = years.iter().min().copied().unwrap_or_default();
    let last_year = years.iter().max().copied().unwrap_or_default();

    let mk = mann_kendall(values);
    let sens = sens_slope(values);

    let total_change = last - first;
    let change_per_year = sens.slope_per_year;

    Ok(TrendStatistics {
        mann_kendall: mk,
        sens_slope: sens,
        n_years: years.len(),
        change_per_year,
        change_percent_per_year: change_per_year / first * 100.0,
        total_change,
        total_percent_change: total_change / first * 100.0,
        significance: Significance::from_p_value(mk.p_value),
        period: format!("{first_year}-{last_year}"),
    })
}
