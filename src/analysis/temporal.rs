//! Temporal analyses: annual trends, per-month trends, fire-year impact.

use std::collections::BTreeMap;

use crate::domain::{
    AnnualMean, AnnualTrend, FireImpact, FireYearStats, MELT_SEASON_MONTHS, MIN_TREND_POINTS,
    MeltSeasonAnalysis, MonthlyTrend, Observation, SIGNIFICANCE_LEVEL, SummaryStats,
};
use crate::math::fit_line;
use crate::stats::descriptive::{mean, sample_std, sample_variance};
use crate::stats::distributions::student_t_two_sided;
use crate::stats::{StatsError, trend_statistics};

/// Minimum observations per (year, month) for a monthly mean to count.
pub const MIN_OBS_PER_MONTH: usize = 3;

/// Days in the June-September melt season.
const MELT_SEASON_DAYS: f64 = 122.0;

/// Group values by key, keeping keys sorted.
pub fn group_values<K: Ord>(pairs: impl IntoIterator<Item = (K, f64)>) -> BTreeMap<K, Vec<f64>> {
    let mut out: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for (k, v) in pairs {
        out.entry(k).or_default().push(v);
    }
    out
}

/// Annual mean/std/count, dropping years with fewer than `min_obs` observations.
pub fn annual_means<'a>(
    observations: impl IntoIterator<Item = &'a Observation>,
    min_obs: usize,
) -> Vec<AnnualMean> {
    group_values(observations.into_iter().map(|o| (o.year, o.value)))
        .into_iter()
        .filter(|(_, values)| values.len() >= min_obs)
        .map(|(year, values)| AnnualMean {
            year,
            mean: mean(&values),
            std: sample_std(&values),
            count: values.len(),
        })
        .collect()
}

/// Run the trend statistics over an annual series.
///
/// Returns `Ok(None)` when fewer than 4 years are available.
pub fn trend_over_annual(annual: Vec<AnnualMean>) -> Result<Option<AnnualTrend>, StatsError> {
    if annual.len() < MIN_TREND_POINTS {
        return Ok(None);
    }
    let years: Vec<i32> = annual.iter().map(|a| a.year).collect();
    let values: Vec<f64> = annual.iter().map(|a| a.mean).collect();
    let trend = trend_statistics(&values, &years)?;

    let x: Vec<f64> = years.iter().map(|&y| f64::from(y)).collect();
    let linear_fit = fit_line(&x, &values);

    Ok(Some(AnnualTrend {
        annual,
        trend,
        linear_fit,
    }))
}

/// Annual trend analysis over all observations.
pub fn analyze_annual_trends(
    observations: &[Observation],
    min_obs_per_year: usize,
) -> Result<Option<AnnualTrend>, StatsError> {
    trend_over_annual(annual_means(observations, min_obs_per_year))
}

/// Per-month trends: for each month, the annual means of that month only.
///
/// Months with fewer than 4 qualifying years are left out.
pub fn analyze_monthly_trends(
    observations: &[Observation],
    months: &[u32],
    min_obs_per_month: usize,
) -> Result<Vec<MonthlyTrend>, StatsError> {
    let mut out = Vec::new();
    for &month in months {
        let annual = annual_means(observations.iter().filter(|o| o.month == month), min_obs_per_month);
        let Some(trend) = trend_over_annual(annual)? else {
            continue;
        };
        out.push(MonthlyTrend {
            month,
            month_name: month_name(month).to_string(),
            annual: trend.annual,
            trend: trend.trend,
        });
    }
    Ok(out)
}

/// Compare fire-year observations against the rest (two-sample Student's t-test).
///
/// Returns `None` when either group is empty.
pub fn analyze_fire_impact(observations: &[Observation], fire_years: &[i32]) -> Option<FireImpact> {
    let (fire, non_fire): (Vec<&Observation>, Vec<&Observation>) =
        observations.iter().partition(|o| fire_years.contains(&o.year));
    if fire.is_empty() || non_fire.is_empty() {
        return None;
    }

    let fire_values: Vec<f64> = fire.iter().map(|o| o.value).collect();
    let non_fire_values: Vec<f64> = non_fire.iter().map(|o| o.value).collect();

    let fire_mean = mean(&fire_values);
    let non_fire_mean = mean(&non_fire_values);
    let difference = fire_mean - non_fire_mean;
    let (t_statistic, p_value) = student_t_test(&fire_values, &non_fire_values);

    let fire_year_stats = group_values(fire.iter().map(|o| (o.year, o.value)))
        .into_iter()
        .map(|(year, values)| FireYearStats {
            year,
            mean: mean(&values),
            std: sample_std(&values),
            count: values.len(),
        })
        .collect();

    Some(FireImpact {
        fire_years: fire_years.to_vec(),
        fire_mean,
        fire_std: sample_std(&fire_values),
        non_fire_mean,
        non_fire_std: sample_std(&non_fire_values),
        difference,
        percent_difference: difference / non_fire_mean * 100.0,
        t_statistic,
        p_value,
        significant: p_value < SIGNIFICANCE_LEVEL,
        fire_year_stats,
    })
}

/// Two-sample Student's t-test assuming equal variances.
///
/// Returns `(t, two-sided p)`; both NaN when the test is undefined.
pub fn student_t_test(a: &[f64], b: &[f64]) -> (f64, f64) {
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let df = na + nb - 2.0;
    if df <= 0.0 {
        return (f64::NAN, f64::NAN);
    }
    let var_a = if a.len() > 1 { sample_variance(a) } else { 0.0 };
    let var_b = if b.len() > 1 { sample_variance(b) } else { 0.0 };
    let pooled = ((na - 1.0) * var_a + (nb - 1.0) * var_b) / df;
    let se = (pooled * (1.0 / na + 1.0 / nb)).sqrt();
    if !(se > 0.0) {
        return (f64::NAN, f64::NAN);
    }
    let t = (mean(a) - mean(b)) / se;
    (t, student_t_two_sided(t, df))
}

/// Whole-dataset summary figures.
pub fn summarize(observations: &[Observation]) -> SummaryStats {
    let values: Vec<f64> = observations.iter().map(|o| o.value).collect();
    let mut years: Vec<i32> = observations.iter().map(|o| o.year).collect();
    years.sort_unstable();
    years.dedup();

    let period = match (years.first(), years.last()) {
        (Some(a), Some(b)) => format!("{a}-{b}"),
        _ => String::new(),
    };
    let completeness = if years.is_empty() {
        0.0
    } else {
        observations.len() as f64 / (years.len() as f64 * MELT_SEASON_DAYS)
    };

    SummaryStats {
        mean_albedo: mean(&values),
        std_albedo: sample_std(&values),
        n_observations: observations.len(),
        years_covered: years,
        period,
        completeness,
    }
}

/// Melt season analysis: annual + June-September monthly + fire impact + summary.
pub fn analyze_melt_season(
    observations: &[Observation],
    min_obs_per_year: usize,
    fire_years: &[i32],
) -> Result<MeltSeasonAnalysis, StatsError> {
    Ok(MeltSeasonAnalysis {
        annual: analyze_annual_trends(observations, min_obs_per_year)?,
        monthly: analyze_monthly_trends(observations, &MELT_SEASON_MONTHS, MIN_OBS_PER_MONTH)?,
        fire_impact: analyze_fire_impact(observations, fire_years),
        summary: summarize(observations),
    })
}

pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}
