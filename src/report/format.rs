//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the analysis code stays clean and testable
//! - output changes are localized

use crate::analysis::spectral::{SpectralRatio, spectral_ratios};
use crate::domain::{
    AnnualMean, AnnualTrend, BandComparison, ContaminationEvent, ContaminationKind,
    HypsometricAnalysis, MeltSeasonAnalysis, SeasonalPatterns, Severity, SpectralRecord,
    SpectralTrendAnalysis, TrendStatistics,
};
use crate::io::ingest::RowError;
use crate::stats::descriptive::mean;

/// How many row errors to echo before summarizing the rest.
const MAX_ROW_ERRORS_SHOWN: usize = 5;

/// Rows read/used/filtered plus the first few row errors.
pub fn format_ingest_summary(
    source: &str,
    rows_read: usize,
    rows_used: usize,
    rows_filtered: usize,
    row_errors: &[RowError],
) -> String {
    let mut out = String::new();
    out.push_str(&format!("Input: {source}\n"));
    out.push_str(&format!(
        "Rows: read={rows_read} used={rows_used} filtered={rows_filtered} errors={}\n",
        row_errors.len()
    ));
    for e in row_errors.iter().take(MAX_ROW_ERRORS_SHOWN) {
        out.push_str(&format!("  line {}: {}\n", e.line, truncate(&e.message, 80)));
    }
    if row_errors.len() > MAX_ROW_ERRORS_SHOWN {
        out.push_str(&format!(
            "  ... {} more\n",
            row_errors.len() - MAX_ROW_ERRORS_SHOWN
        ));
    }
    out
}

/// Trend statistics block (Mann-Kendall + Sen's slope + change figures).
pub fn format_trend_statistics(t: &TrendStatistics) -> String {
    let mut out = String::new();
    out.push_str(&format!("Period: {} ({} years)\n", t.period, t.n_years));
    out.push_str(&format!(
        "Trend: {} (p={}, tau={:.3})\n",
        t.mann_kendall.trend.display_name(),
        fmt_p(t.mann_kendall.p_value),
        t.mann_kendall.tau
    ));
    out.push_str(&format!(
        "Sen's slope: {:+.5}/yr ({})\n",
        t.sens_slope.slope_per_year,
        fmt_pct_per_year(t.change_percent_per_year)
    ));
    out.push_str(&format!(
        "Total change: {:+.4} ({})\n",
        t.total_change,
        fmt_pct(t.total_percent_change)
    ));
    out.push_str(&format!("Significance: {}\n", t.significance.as_str()));
    out
}

pub fn format_annual_table(annual: &[AnnualMean]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<6} {:>8} {:>8} {:>6}\n", "year", "mean", "std", "n"));
    out.push_str(&format!("{:-<6} {:-<8} {:-<8} {:-<6}\n", "", "", "", ""));
    for a in annual {
        out.push_str(&format!(
            "{:<6} {:>8.4} {:>8} {:>6}\n",
            a.year,
            a.mean,
            fmt_opt(a.std, 4),
            a.count
        ));
    }
    out
}

/// Annual trend summary with the OLS line for reference.
pub fn format_annual_trend(title: &str, trend: &AnnualTrend) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {title} ===\n"));
    out.push_str(&format_trend_statistics(&trend.trend));
    if let Some(fit) = &trend.linear_fit {
        out.push_str(&format!(
            "Linear fit: {:+.5}/yr (R²={:.3})\n",
            fit.slope, fit.r_squared
        ));
    }
    out.push('\n');
    out.push_str(&format_annual_table(&trend.annual));
    out
}

pub fn format_melt_season(analysis: &MeltSeasonAnalysis) -> String {
    let mut out = String::new();
    let s = &analysis.summary;

    out.push_str("=== Melt season albedo (June-September) ===\n");
    out.push_str(&format!(
        "Observations: {} over {} | mean={:.4} std={} | completeness={:.1}%\n\n",
        s.n_observations,
        s.period,
        s.mean_albedo,
        fmt_opt(s.std_albedo, 4),
        s.completeness * 100.0
    ));

    match &analysis.annual {
        Some(annual) => out.push_str(&format_annual_trend("Annual trend", annual)),
        None => out.push_str("Annual trend: not enough years\n"),
    }

    out.push_str("\nMonthly trends:\n");
    if analysis.monthly.is_empty() {
        out.push_str("  (no month with enough years)\n");
    }
    for m in &analysis.monthly {
        out.push_str(&format!(
            "  {:<10} {:<11} slope={:+.5}/yr ({}) p={} [{}]\n",
            m.month_name,
            m.trend.mann_kendall.trend.display_name(),
            m.trend.sens_slope.slope_per_year,
            fmt_pct_per_year(m.trend.change_percent_per_year),
            fmt_p(m.trend.mann_kendall.p_value),
            m.trend.period
        ));
    }

    if let Some(fire) = &analysis.fire_impact {
        let years: Vec<String> = fire.fire_years.iter().map(|y| y.to_string()).collect();
        out.push_str(&format!("\nFire years ({}):\n", years.join(", ")));
        out.push_str(&format!(
            "  fire mean={:.4} vs non-fire mean={:.4} | diff={:+.4} ({})\n",
            fire.fire_mean,
            fire.non_fire_mean,
            fire.difference,
            fmt_pct(fire.percent_difference)
        ));
        out.push_str(&format!(
            "  t={:.3} p={} {}\n",
            fire.t_statistic,
            fmt_p(fire.p_value),
            if fire.significant { "(significant)" } else { "(not significant)" }
        ));
    }
    out
}

pub fn format_hypsometric(analysis: &HypsometricAnalysis, comparison: Option<&BandComparison>) -> String {
    let mut out = String::new();
    let m = analysis.median_elevation;

    out.push_str("=== Hypsometric analysis (±100 m around median) ===\n");
    out.push_str(&format!("Median elevation: {m:.0} m\n"));
    out.push_str("Band distribution:\n");
    for (band, count) in &analysis.band_counts {
        out.push_str(&format!("  {:<22} {count}\n", band.display_name()));
    }

    out.push('\n');
    out.push_str(&format!(
        "{:<22} {:>11} {:>10} {:>9} {:>8} {:>6}\n",
        "band", "elev (m)", "slope/yr", "%/yr", "p", "years"
    ));
    out.push_str(&format!(
        "{:-<22} {:->11} {:->10} {:->9} {:->8} {:->6}\n",
        "", "", "", "", "", ""
    ));
    for b in &analysis.bands {
        let t = &b.trend;
        out.push_str(&format!(
            "{:<22} {:>11} {:>+10.5} {:>9} {:>8} {:>6}\n",
            b.band_name,
            format!("{:.0}-{:.0}", b.elevation_range.min, b.elevation_range.max),
            t.sens_slope.slope_per_year,
            fmt_pct(t.change_percent_per_year),
            fmt_p(t.mann_kendall.p_value),
            t.n_years
        ));
    }

    match comparison {
        Some(c) => {
            out.push_str(&format!(
                "\nStrongest decline: {} ({:+.5}/yr)\n",
                c.strongest_decline_band.display_name(),
                c.strongest_decline_value
            ));
            out.push_str(&format!(
                "Transient snowline pattern: {}\n",
                yes_no(c.transient_snowline_pattern)
            ));
            out.push_str(&format!(
                "Elevation gradient pattern: {}\n",
                yes_no(c.elevation_gradient_pattern)
            ));
            out.push_str(&format!("Pattern: {}\n", c.pattern.as_str()));
            out.push_str(&format!("Interpretation: {}\n", c.interpretation));
        }
        None => out.push_str("\nBand comparison: needs at least two bands with trends\n"),
    }
    out
}

pub fn format_spectral(
    trends: Option<&SpectralTrendAnalysis>,
    seasonal: Option<&SeasonalPatterns>,
    records: &[SpectralRecord],
    events: &[ContaminationEvent],
) -> String {
    let mut out = String::new();
    out.push_str("=== Spectral albedo (MCD43A3) ===\n");

    if let Some(t) = trends {
        out.push_str(&format!("Period: {} ({} years)\n", t.period, t.n_years));
        for group in &t.groups {
            out.push_str(&format!("\n{}:\n", group.group.as_str()));
            if group.trends.is_empty() {
                out.push_str("  (no band with enough years)\n");
            }
            for b in &group.trends {
                out.push_str(&format!(
                    "  {:<22} {:<11} {:>12} p={} {}\n",
                    b.band,
                    b.mann_kendall.trend.display_name(),
                    fmt_pct_per_year(b.change_percent_per_year),
                    fmt_p(b.mann_kendall.p_value),
                    b.significance
                ));
            }
        }
        if let Some(c) = &t.comparison {
            out.push_str(&format!(
                "\nVisible avg: {} | NIR avg: {} -> {}\n",
                fmt_pct_per_year(c.visible_avg_change),
                fmt_pct_per_year(c.nir_avg_change),
                match c.interpretation {
                    crate::domain::SpectralDominance::VisibleDominant =>
                        "visible dominant (light-absorbing particles)",
                    crate::domain::SpectralDominance::NirDominant =>
                        "NIR similar or stronger (grain-size effects)",
                }
            ));
        }
    }

    if let Some(s) = seasonal {
        out.push_str(&format!(
            "\nSeasonal pattern ({} melt-season records, {}):\n",
            s.total_observations, s.period
        ));
        for b in &s.bands {
            out.push_str(&format!(
                "  {:<22} early={:.4} late={:.4} change={}\n",
                b.band,
                b.early_season_mean,
                b.late_season_mean,
                fmt_pct(b.seasonal_change_percent)
            ));
        }
    }

    out.push_str("\nSpectral ratios:\n");
    for ratio in SpectralRatio::ALL {
        let values: Vec<f64> = spectral_ratios(records, ratio).into_iter().map(|(_, v)| v).collect();
        if values.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "  {:<15} mean={:.3} (n={})\n",
            ratio.as_str(),
            mean(&values),
            values.len()
        ));
    }

    let count = |kind: ContaminationKind, severity: Severity| {
        events.iter().filter(|e| e.kind == kind && e.severity == severity).count()
    };
    out.push_str(&format!("\nContamination events: {}\n", events.len()));
    for kind in [ContaminationKind::LowVisNirRatio, ContaminationKind::LowVisibleAlbedo] {
        out.push_str(&format!(
            "  {:<20} high={} moderate={}\n",
            kind.as_str(),
            count(kind, Severity::High),
            count(kind, Severity::Moderate)
        ));
    }
    out
}

fn fmt_p(p: f64) -> String {
    if p < 0.001 { "<0.001".to_string() } else { format!("{p:.3}") }
}

fn fmt_pct(v: f64) -> String {
    if v.is_finite() { format!("{v:+.2}%") } else { "n/a".to_string() }
}

/// Percent rate with its unit, or `n/a` alone when undefined.
fn fmt_pct_per_year(v: f64) -> String {
    if v.is_finite() { format!("{v:+.2}%/yr") } else { "n/a".to_string() }
}

fn fmt_opt(v: f64, decimals: usize) -> String {
    if v.is_finite() { format!("{v:.decimals$}") } else { "-".to_string() }
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
