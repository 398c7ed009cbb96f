//! MCD43A3 spectral albedo: band trends, seasonal patterns and the
//! visible/NIR contamination heuristic.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{
    ContaminationEvent, ContaminationKind, MIN_TREND_POINTS, MonthStats, SeasonalBandStats,
    SeasonalPatterns, Severity, SpectralBandTrend, SpectralComparison, SpectralDominance,
    SpectralGroup, SpectralGroupTrends, SpectralRecord, SpectralTrendAnalysis,
};
use crate::stats::descriptive::{mean, percentile, sample_std};
use crate::stats::{mann_kendall, sens_slope};

pub const VIS_BAND: &str = "Albedo_BSA_vis";
pub const NIR_BAND: &str = "Albedo_BSA_nir";
pub const SHORTWAVE_BAND: &str = "Albedo_BSA_shortwave";

/// Default percentile below which a ratio counts as contaminated.
pub const DEFAULT_CONTAMINATION_PERCENTILE: f64 = 10.0;

/// Fraction of the threshold under which an event is rated `high`.
pub const HIGH_SEVERITY_FACTOR: f64 = 0.8;

const EARLY_SEASON: [u32; 2] = [6, 7];
const LATE_SEASON: [u32; 2] = [8, 9];

/// Named band ratio computed per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectralRatio {
    /// `vis / nir`
    VisNir,
    /// `Band1 / Band2` (red over NIR)
    RedNir,
    /// `Band3 / Band1` (blue over red)
    BlueRed,
}

impl SpectralRatio {
    pub const ALL: [SpectralRatio; 3] = [
        SpectralRatio::VisNir,
        SpectralRatio::RedNir,
        SpectralRatio::BlueRed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SpectralRatio::VisNir => "vis_nir_ratio",
            SpectralRatio::RedNir => "red_nir_ratio",
            SpectralRatio::BlueRed => "blue_red_ratio",
        }
    }

    fn bands(self) -> (&'static str, &'static str) {
        match self {
            SpectralRatio::VisNir => (VIS_BAND, NIR_BAND),
            SpectralRatio::RedNir => ("Albedo_BSA_Band1", "Albedo_BSA_Band2"),
            SpectralRatio::BlueRed => ("Albedo_BSA_Band3", "Albedo_BSA_Band1"),
        }
    }

    /// Ratio for one record; `None` when a band is missing or the ratio is not finite.
    pub fn compute(self, record: &SpectralRecord) -> Option<f64> {
        let (num, den) = self.bands();
        let ratio = record.band(num)? / record.band(den)?;
        ratio.is_finite().then_some(ratio)
    }
}

/// `(date, ratio)` for every record where the ratio is defined.
pub fn spectral_ratios(records: &[SpectralRecord], ratio: SpectralRatio) -> Vec<(NaiveDate, f64)> {
    records
        .iter()
        .filter_map(|r| ratio.compute(r).map(|v| (r.date, v)))
        .collect()
}

/// Flag dates whose value falls below the `threshold_percentile` of its own
/// empirical distribution.
fn low_value_events(
    series: &[(NaiveDate, f64)],
    threshold_percentile: f64,
    kind: ContaminationKind,
) -> Vec<ContaminationEvent> {
    let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
    let Some(threshold) = percentile(&values, threshold_percentile) else {
        return Vec::new();
    };
    series
        .iter()
        .filter(|(_, v)| *v < threshold)
        .map(|&(date, value)| ContaminationEvent {
            date,
            kind,
            value,
            threshold,
            severity: if value < threshold * HIGH_SEVERITY_FACTOR {
                Severity::High
            } else {
                Severity::Moderate
            },
        })
        .collect()
}

/// Candidate light-absorbing-particle events.
///
/// Low vis/NIR ratio events come first, then low visible albedo events, each
/// in record order.
pub fn detect_contamination_events(
    records: &[SpectralRecord],
    threshold_percentile: f64,
) -> Vec<ContaminationEvent> {
    let mut events = low_value_events(
        &spectral_ratios(records, SpectralRatio::VisNir),
        threshold_percentile,
        ContaminationKind::LowVisNirRatio,
    );

    let visible: Vec<(NaiveDate, f64)> = records
        .iter()
        .filter_map(|r| r.band(VIS_BAND).filter(|v| v.is_finite()).map(|v| (r.date, v)))
        .collect();
    events.extend(low_value_events(
        &visible,
        threshold_percentile,
        ContaminationKind::LowVisibleAlbedo,
    ));
    events
}

/// Per-band annual means keyed by year (years where the band is absent are skipped).
fn annual_band_means(records: &[SpectralRecord], band: &str) -> BTreeMap<i32, f64> {
    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let Some(v) = record.band(band).filter(|v| v.is_finite()) {
            by_year.entry(record.year).or_default().push(v);
        }
    }
    by_year.into_iter().map(|(y, vs)| (y, mean(&vs))).collect()
}

fn band_trend(records: &[SpectralRecord], band: &str) -> Option<SpectralBandTrend> {
    let values: Vec<f64> = annual_band_means(records, band).into_values().collect();
    if values.len() < MIN_TREND_POINTS {
        return None;
    }
    let mk = mann_kendall(&values);
    let sens = sens_slope(&values);
    let first = values[0];
    let change_percent_per_year = if first > 0.0 {
        sens.slope_per_year / first * 100.0
    } else {
        0.0
    };
    Some(SpectralBandTrend {
        band: band.to_string(),
        mann_kendall: mk,
        sens_slope: sens,
        change_per_year: sens.slope_per_year,
        change_percent_per_year,
        significance: if mk.is_significant() { "***" } else { "ns" }.to_string(),
        n_years: values.len(),
    })
}

/// Trends per spectral band, grouped visible / near-infrared / broadband.
///
/// Bands with fewer than 4 years of data are left out. Returns `None` when the
/// records carry no `Albedo_BSA_*` band at all.
pub fn analyze_spectral_trends(records: &[SpectralRecord]) -> Option<SpectralTrendAnalysis> {
    let has_bsa = records
        .iter()
        .any(|r| r.bands.keys().any(|k| k.starts_with("Albedo_BSA")));
    if !has_bsa {
        return None;
    }

    let mut years: Vec<i32> = records.iter().map(|r| r.year).collect();
    years.sort_unstable();
    years.dedup();
    let period = match (years.first(), years.last()) {
        (Some(a), Some(b)) => format!("{a}-{b}"),
        _ => String::new(),
    };

    let groups: Vec<SpectralGroupTrends> = SpectralGroup::ALL
        .iter()
        .map(|&group| SpectralGroupTrends {
            group,
            trends: group
                .bands()
                .iter()
                .filter_map(|band| band_trend(records, band))
                .collect(),
        })
        .collect();

    let average_change = |group: SpectralGroup| -> Option<f64> {
        let changes: Vec<f64> = groups
            .iter()
            .find(|g| g.group == group)?
            .trends
            .iter()
            .map(|t| t.change_percent_per_year)
            .collect();
        (!changes.is_empty()).then(|| mean(&changes))
    };
    let comparison = match (
        average_change(SpectralGroup::Visible),
        average_change(SpectralGroup::NearInfrared),
    ) {
        (Some(visible_avg_change), Some(nir_avg_change)) => Some(SpectralComparison {
            visible_avg_change,
            nir_avg_change,
            interpretation: if visible_avg_change.abs() > nir_avg_change.abs() {
                SpectralDominance::VisibleDominant
            } else {
                SpectralDominance::NirDominant
            },
        }),
        _ => None,
    };

    Some(SpectralTrendAnalysis {
        period,
        n_years: years.len(),
        groups,
        comparison,
    })
}

/// Melt-season monthly statistics and early vs late season change for the
/// visible, NIR and shortwave bands.
///
/// Returns `None` when no record falls in June-September.
pub fn analyze_seasonal_patterns(records: &[SpectralRecord]) -> Option<SeasonalPatterns> {
    let melt: Vec<&SpectralRecord> = records
        .iter()
        .filter(|r| (6..=9).contains(&r.month))
        .collect();
    if melt.is_empty() {
        return None;
    }

    let mut bands = Vec::new();
    for band in [VIS_BAND, NIR_BAND, SHORTWAVE_BAND] {
        let mut by_month: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for record in &melt {
            if let Some(v) = record.band(band).filter(|v| v.is_finite()) {
                by_month.entry(record.month).or_default().push(v);
            }
        }
        if by_month.is_empty() {
            continue;
        }

        let season_mean = |months: &[u32]| {
            let values: Vec<f64> = months
                .iter()
                .filter_map(|m| by_month.get(m))
                .flatten()
                .copied()
                .collect();
            mean(&values)
        };
        let early_season_mean = season_mean(&EARLY_SEASON);
        let late_season_mean = season_mean(&LATE_SEASON);
        let seasonal_change = late_season_mean - early_season_mean;
        let seasonal_change_percent = if early_season_mean > 0.0 {
            seasonal_change / early_season_mean * 100.0
        } else {
            0.0
        };

        let monthly = by_month
            .iter()
            .map(|(&month, values)| MonthStats {
                month,
                mean: mean(values),
                std: sample_std(values),
                count: values.len(),
            })
            .collect();

        bands.push(SeasonalBandStats {
            band: band.to_string(),
            monthly,
            early_season_mean,
            late_season_mean,
            seasonal_change,
            seasonal_change_percent,
        });
    }

    let (first, last) = melt
        .iter()
        .fold((i32::MAX, i32::MIN), |(lo, hi), r| (lo.min(r.year), hi.max(r.year)));

    Some(SeasonalPatterns {
        bands,
        period: format!("{first}-{last}"),
        total_observations: melt.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TrendDirection;
    use chrono::Datelike;

    fn record(year: i32, month: u32, day: u32, bands: &[(&str, f64)]) -> SpectralRecord {
        let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
        SpectralRecord {
            date,
            year: date.year(),
            month: date.month(),
            bands: bands.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn ratios_drop_non_finite_values() {
        let records = vec![
            record(2020, 7, 1, &[(VIS_BAND, 0.8), (NIR_BAND, 0.4)]),
            record(2020, 7, 2, &[(VIS_BAND, 0.8), (NIR_BAND, 0.0)]),
            record(2020, 7, 3, &[(VIS_BAND, 0.8)]),
        ];
        let ratios = spectral_ratios(&records, SpectralRatio::VisNir);
        assert_eq!(ratios.len(), 1);
        assert!((ratios[0].1 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn contamination_flags_values_below_percentile() {
        // Ratios 1.0..=2.0 in 0.1 steps plus one very low ratio.
        let mut records: Vec<SpectralRecord> = (0..11)
            .map(|i| {
                let ratio = 1.0 + 0.1 * f64::from(i);
                record(2020, 7, 1 + i as u32, &[(VIS_BAND, 0.5 * ratio), (NIR_BAND, 0.5)])
            })
            .collect();
        records.push(record(2020, 8, 1, &[(VIS_BAND, 0.2), (NIR_BAND, 0.5)]));

        let events = detect_contamination_events(&records, 10.0);
        let ratio_events: Vec<_> = events
            .iter()
            .filter(|e| e.kind == ContaminationKind::LowVisNirRatio)
            .collect();
        assert_eq!(ratio_events.len(), 2);

        // Sorted ratios 0.4, 1.0, 1.1, ...: the 10th percentile lands between 1.0 and 1.1.
        let threshold = ratio_events[0].threshold;
        assert!(threshold > 1.0 && threshold < 1.1, "threshold={threshold}");
        let low = ratio_events.iter().find(|e| (e.value - 0.4).abs() < 1e-9).unwrap();
        assert_eq!(low.severity, Severity::High);
        let edge = ratio_events.iter().find(|e| (e.value - 1.0).abs() < 1e-9).unwrap();
        assert_eq!(edge.severity, Severity::Moderate);

        assert!(events.iter().any(|e| e.kind == ContaminationKind::LowVisibleAlbedo));
        assert!(events.iter().all(|e| e.value < e.threshold));
    }

    #[test]
    fn contamination_on_empty_input() {
        assert!(detect_contamination_events(&[], 10.0).is_empty());
    }

    #[test]
    fn spectral_trends_group_bands_and_compare() {
        let records: Vec<SpectralRecord> = (2015..=2022)
            .map(|year| {
                let k = f64::from(year - 2015);
                record(
                    year,
                    7,
                    15,
                    &[
                        (VIS_BAND, 0.80 - 0.02 * k),
                        (NIR_BAND, 0.50 - 0.005 * k),
                        (SHORTWAVE_BAND, 0.60 - 0.01 * k),
                        ("Albedo_BSA_Band1", 0.0),
                    ],
                )
            })
            .collect();

        let analysis = analyze_spectral_trends(&records).unwrap();
        assert_eq!(analysis.period, "2015-2022");
        assert_eq!(analysis.n_years, 8);

        let visible = &analysis.groups[0];
        assert_eq!(visible.group, SpectralGroup::Visible);
        assert_eq!(visible.trends.len(), 2);
        let band1 = visible.trends.iter().find(|t| t.band == "Albedo_BSA_Band1").unwrap();
        assert_eq!(band1.change_percent_per_year, 0.0);
        assert_eq!(band1.significance, "ns");

        let vis = visible.trends.iter().find(|t| t.band == VIS_BAND).unwrap();
        assert_eq!(vis.mann_kendall.trend, TrendDirection::Decreasing);
        assert_eq!(vis.significance, "***");
        assert!((vis.change_percent_per_year + 2.5).abs() < 1e-9);

        let comparison = analysis.comparison.unwrap();
        assert!((comparison.visible_avg_change + 1.25).abs() < 1e-9);
        assert!((comparison.nir_avg_change + 1.0).abs() < 1e-9);
        assert_eq!(comparison.interpretation, SpectralDominance::VisibleDominant);
    }

    #[test]
    fn spectral_trends_need_bsa_bands() {
        let records = vec![record(2020, 7, 1, &[("Albedo_WSA_vis", 0.5)])];
        assert!(analyze_spectral_trends(&records).is_none());
    }

    #[test]
    fn seasonal_patterns_compare_early_and_late() {
        let records = vec![
            record(2020, 5, 20, &[(VIS_BAND, 0.95)]),
            record(2020, 6, 10, &[(VIS_BAND, 0.9), (NIR_BAND, 0.6)]),
            record(2020, 7, 10, &[(VIS_BAND, 0.8), (NIR_BAND, 0.6)]),
            record(2021, 8, 10, &[(VIS_BAND, 0.6), (NIR_BAND, 0.5)]),
            record(2021, 9, 10, &[(VIS_BAND, 0.5), (NIR_BAND, 0.5)]),
        ];
        let patterns = analyze_seasonal_patterns(&records).unwrap();
        assert_eq!(patterns.total_observations, 4);
        assert_eq!(patterns.period, "2020-2021");
        assert_eq!(patterns.bands.len(), 2);

        let vis = &patterns.bands[0];
        assert_eq!(vis.monthly.len(), 4);
        assert!((vis.early_season_mean - 0.85).abs() < 1e-12);
        assert!((vis.late_season_mean - 0.55).abs() < 1e-12);
        assert!((vis.seasonal_change_percent + 0.30 / 0.85 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn seasonal_patterns_ignore_off_season() {
        let records = vec![record(2020, 3, 1, &[(VIS_BAND, 0.9)])];
        assert!(analyze_seasonal_patterns(&records).is_none());
    }
}
