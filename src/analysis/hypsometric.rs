//! Elevation-band (hypsometric) analysis.
//!
//! Observations are split into three bands around the glacier median
//! elevation (±100 m), each band gets its own annual trend, and the band
//! slopes are compared to label the spatial pattern of the decline.

use std::collections::BTreeMap;

use crate::domain::{
    BandComparison, BandTrend, ElevationBand, ElevationRange, HypsometricAnalysis, Observation,
    SpatialPattern,
};
use crate::stats::StatsError;
use crate::stats::descriptive::{mean, median, min_max};

use super::temporal::{annual_means, trend_over_annual};

/// Half-width of the near-median band, in meters.
pub const BAND_HALF_WIDTH_M: f64 = 100.0;

/// Band slopes closer than this (per year) are treated as one uniform decline.
pub const UNIFORM_SLOPE_TOLERANCE: f64 = 0.0005;

/// Band assignment for a set of observations, parallel to the input.
#[derive(Debug, Clone, PartialEq)]
pub struct BandClassification {
    pub median_elevation: f64,
    pub bands: Vec<ElevationBand>,
}

impl BandClassification {
    /// Input indices grouped by band. Every index appears exactly once.
    pub fn partition(&self) -> BTreeMap<ElevationBand, Vec<usize>> {
        let mut out: BTreeMap<ElevationBand, Vec<usize>> = BTreeMap::new();
        for (i, band) in self.bands.iter().enumerate() {
            out.entry(*band).or_default().push(i);
        }
        out
    }

    pub fn counts(&self) -> BTreeMap<ElevationBand, usize> {
        let mut out: BTreeMap<ElevationBand, usize> =
            ElevationBand::ALL.iter().map(|b| (*b, 0)).collect();
        for band in &self.bands {
            *out.entry(*band).or_default() += 1;
        }
        out
    }
}

pub fn band_for_elevation(elevation: f64, median_elevation: f64) -> ElevationBand {
    let diff = elevation - median_elevation;
    if diff > BAND_HALF_WIDTH_M {
        ElevationBand::AboveMedian
    } else if diff < -BAND_HALF_WIDTH_M {
        ElevationBand::BelowMedian
    } else {
        ElevationBand::NearMedian
    }
}

/// Classify each observation into an elevation band.
///
/// The median is computed once from every observation's elevation unless
/// supplied. Observations without an elevation count as sitting on the median.
/// Returns `None` for empty input or when no median can be established.
pub fn classify_elevation_bands(
    observations: &[Observation],
    median_elevation: Option<f64>,
) -> Option<BandClassification> {
    if observations.is_empty() {
        return None;
    }
    let median_elevation = match median_elevation {
        Some(m) => m,
        None => {
            let elevations: Vec<f64> = observations.iter().filter_map(|o| o.elevation).collect();
            median(&elevations)?
        }
    };

    let bands = observations
        .iter()
        .map(|o| band_for_elevation(o.elevation.unwrap_or(median_elevation), median_elevation))
        .collect();

    Some(BandClassification {
        median_elevation,
        bands,
    })
}

fn elevation_range(observations: &[&Observation]) -> Option<ElevationRange> {
    let elevations: Vec<f64> = observations.iter().filter_map(|o| o.elevation).collect();
    let median = median(&elevations)?;
    let (min, max) = min_max(&elevations)?;
    Some(ElevationRange {
        min,
        max,
        mean: mean(&elevations),
        median,
    })
}

/// Per-band annual trends.
///
/// Bands with fewer than 4 qualifying years are left out of `bands` but still
/// show up in `band_counts`.
pub fn analyze_hypsometric_trends(
    observations: &[Observation],
    median_elevation: Option<f64>,
    min_obs_per_year: usize,
) -> Result<Option<HypsometricAnalysis>, StatsError> {
    let Some(classification) = classify_elevation_bands(observations, median_elevation) else {
        return Ok(None);
    };

    let mut bands = Vec::new();
    for (band, indices) in classification.partition() {
        let members: Vec<&Observation> = indices.iter().map(|&i| &observations[i]).collect();
        let annual = annual_means(members.iter().copied(), min_obs_per_year);
        let Some(trend) = trend_over_annual(annual)? else {
            continue;
        };
        let Some(elevation_range) = elevation_range(&members) else {
            continue;
        };
        bands.push(BandTrend {
            band,
            band_name: band.display_name().to_string(),
            elevation_range,
            n_observations: members.len(),
            annual: trend.annual,
            trend: trend.trend,
        });
    }

    Ok(Some(HypsometricAnalysis {
        median_elevation: classification.median_elevation,
        band_counts: classification.counts(),
        bands,
    }))
}

/// Compare band slopes. Needs results for at least two bands.
pub fn compare_elevation_bands(analysis: &HypsometricAnalysis) -> Option<BandComparison> {
    if analysis.bands.len() < 2 {
        return None;
    }

    let slopes_by_band: BTreeMap<ElevationBand, f64> = analysis
        .bands
        .iter()
        .map(|b| (b.band, b.trend.sens_slope.slope_per_year))
        .collect();
    let significance_by_band = analysis
        .bands
        .iter()
        .map(|b| (b.band, b.trend.mann_kendall.is_significant()))
        .collect();

    let (strongest_decline_band, strongest_decline_value) = strongest_decline(&slopes_by_band)?;

    let slope_or_zero = |band: ElevationBand| slopes_by_band.get(&band).copied().unwrap_or(0.0);
    let above = slope_or_zero(ElevationBand::AboveMedian);
    let near = slope_or_zero(ElevationBand::NearMedian);
    let below = slope_or_zero(ElevationBand::BelowMedian);

    let transient_snowline_pattern =
        slopes_by_band.contains_key(&ElevationBand::NearMedian) && near < above && near < below;
    let elevation_gradient_pattern = slopes_by_band.contains_key(&ElevationBand::AboveMedian)
        && slopes_by_band.contains_key(&ElevationBand::BelowMedian)
        && below < above;

    let slopes: Vec<f64> = slopes_by_band.values().copied().collect();
    let spread = min_max(&slopes).map_or(f64::INFINITY, |(lo, hi)| hi - lo);
    let pattern = if transient_snowline_pattern {
        SpatialPattern::TransientSnowline
    } else if elevation_gradient_pattern {
        SpatialPattern::ElevationGradient
    } else if spread < UNIFORM_SLOPE_TOLERANCE {
        SpatialPattern::Uniform
    } else {
        SpatialPattern::Complex
    };

    Some(BandComparison {
        interpretation: interpret_elevation_pattern(&slopes_by_band),
        slopes_by_band,
        significance_by_band,
        strongest_decline_band,
        strongest_decline_value,
        transient_snowline_pattern,
        elevation_gradient_pattern,
        pattern,
    })
}

fn strongest_decline(slopes: &BTreeMap<ElevationBand, f64>) -> Option<(ElevationBand, f64)> {
    slopes.iter().fold(None, |best, (&band, &slope)| match best {
        Some((_, s)) if s <= slope => best,
        _ => Some((band, slope)),
    })
}

/// Human-readable reading of the band slopes. Missing bands count as 0.
pub fn interpret_elevation_pattern(slopes: &BTreeMap<ElevationBand, f64>) -> String {
    let Some((strongest, _)) = strongest_decline(slopes) else {
        return "Insufficient data for interpretation".to_string();
    };
    let slope_or_zero = |band: ElevationBand| slopes.get(&band).copied().unwrap_or(0.0);
    let above = slope_or_zero(ElevationBand::AboveMedian);
    let near = slope_or_zero(ElevationBand::NearMedian);
    let below = slope_or_zero(ElevationBand::BelowMedian);

    if near < above && near < below {
        "Transient snowline rise (strongest decline near median elevation)".to_string()
    } else if below < near && below < above {
        "Enhanced lower-elevation warming (strongest decline in ablation zone)".to_string()
    } else if above < near && above < below {
        "High-elevation sensitivity (strongest decline in accumulation zone)".to_string()
    } else if (above - near).abs() < UNIFORM_SLOPE_TOLERANCE
        && (near - below).abs() < UNIFORM_SLOPE_TOLERANCE
    {
        "Uniform glacier-wide decline (similar trends across elevation)".to_string()
    } else {
        format!(
            "Complex pattern (strongest decline: {})",
            strongest.as_str().replace('_', " ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        MannKendall, SensSlope, Significance, TrendDirection, TrendStatistics,
    };
    use chrono::{Datelike, NaiveDate};

    fn obs(year: i32, day: u32, value: f64, elevation: f64) -> Observation {
        let date = NaiveDate::from_ymd_opt(year, 7, day).unwrap();
        Observation {
            date,
            year: date.year(),
            month: date.month(),
            value,
            pixel_count: None,
            elevation: Some(elevation),
        }
    }

    fn band_trend(band: ElevationBand, slope: f64) -> BandTrend {
        BandTrend {
            band,
            band_name: band.display_name().to_string(),
            elevation_range: ElevationRange {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                median: 0.0,
            },
            n_observations: 0,
            annual: Vec::new(),
            trend: TrendStatistics {
                mann_kendall: MannKendall {
                    trend: TrendDirection::Decreasing,
                    p_value: 0.01,
                    tau: -0.8,
                },
                sens_slope: SensSlope {
                    slope_per_year: slope,
                    intercept: 0.5,
                },
                n_years: 10,
                change_per_year: slope,
                change_percent_per_year: 0.0,
                total_change: 0.0,
                total_percent_change: 0.0,
                significance: Significance::Significant,
                period: "2015-2024".to_string(),
            },
        }
    }

    fn analysis_with(slopes: &[(ElevationBand, f64)]) -> HypsometricAnalysis {
        HypsometricAnalysis {
            median_elevation: 2400.0,
            band_counts: BTreeMap::new(),
            bands: slopes.iter().map(|&(b, s)| band_trend(b, s)).collect(),
        }
    }

    #[test]
    fn band_boundaries_are_inclusive_of_100m() {
        assert_eq!(band_for_elevation(2500.0, 2400.0), ElevationBand::NearMedian);
        assert_eq!(band_for_elevation(2300.0, 2400.0), ElevationBand::NearMedian);
        assert_eq!(band_for_elevation(2500.1, 2400.0), ElevationBand::AboveMedian);
        assert_eq!(band_for_elevation(2299.9, 2400.0), ElevationBand::BelowMedian);
    }

    #[test]
    fn partition_covers_every_observation_once() {
        let data: Vec<Observation> = [2150.0, 2390.0, 2410.0, 2700.0, 2300.0, 2501.0, 2000.0]
            .iter()
            .enumerate()
            .map(|(i, &e)| obs(2020, 1 + i as u32, 0.5, e))
            .collect();
        let classification = classify_elevation_bands(&data, Some(2400.0)).unwrap();
        assert_eq!(classification.bands.len(), data.len());

        let mut seen: Vec<usize> = classification.partition().into_values().flatten().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..data.len()).collect::<Vec<_>>());

        let counts = classification.counts();
        assert_eq!(counts[&ElevationBand::AboveMedian], 2);
        assert_eq!(counts[&ElevationBand::NearMedian], 3);
        assert_eq!(counts[&ElevationBand::BelowMedian], 2);
    }

    #[test]
    fn median_is_computed_when_missing() {
        let data = vec![obs(2020, 1, 0.5, 2000.0), obs(2020, 2, 0.5, 2400.0), obs(2020, 3, 0.5, 2800.0)];
        let classification = classify_elevation_bands(&data, None).unwrap();
        assert_eq!(classification.median_elevation, 2400.0);
        assert_eq!(
            classification.bands,
            vec![ElevationBand::BelowMedian, ElevationBand::NearMedian, ElevationBand::AboveMedian]
        );
        assert!(classify_elevation_bands(&[], None).is_none());
    }

    #[test]
    fn band_trends_skip_sparse_bands() {
        let mut data = Vec::new();
        for year in 2015..=2022 {
            let k = f64::from(year - 2015);
            for d in 1..=5 {
                data.push(obs(year, d, 0.60 - 0.010 * k, 2400.0));
                data.push(obs(year, d + 10, 0.40 - 0.005 * k, 2100.0));
            }
        }
        // Only two years above the median.
        for year in [2015, 2016] {
            for d in 1..=5 {
                data.push(obs(year, d + 20, 0.7, 2700.0));
            }
        }

        let analysis = analyze_hypsometric_trends(&data, Some(2400.0), 5).unwrap().unwrap();
        assert_eq!(analysis.bands.len(), 2);
        assert!(analysis.band(ElevationBand::AboveMedian).is_none());
        assert_eq!(analysis.band_counts[&ElevationBand::AboveMedian], 10);

        let near = analysis.band(ElevationBand::NearMedian).unwrap();
        assert!((near.trend.sens_slope.slope_per_year + 0.010).abs() < 1e-9);
        assert_eq!(near.n_observations, 40);
        assert_eq!(near.elevation_range.median, 2400.0);

        let comparison = compare_elevation_bands(&analysis).unwrap();
        assert_eq!(comparison.strongest_decline_band, ElevationBand::NearMedian);
        assert!(comparison.transient_snowline_pattern);
    }

    #[test]
    fn transient_snowline_detected() {
        let analysis = analysis_with(&[
            (ElevationBand::AboveMedian, -0.001),
            (ElevationBand::NearMedian, -0.010),
            (ElevationBand::BelowMedian, -0.002),
        ]);
        let c = compare_elevation_bands(&analysis).unwrap();
        assert!(c.transient_snowline_pattern);
        assert!(c.elevation_gradient_pattern);
        assert_eq!(c.pattern, SpatialPattern::TransientSnowline);
        assert_eq!(c.strongest_decline_band, ElevationBand::NearMedian);
        assert_eq!(c.strongest_decline_value, -0.010);
        assert!(c.interpretation.starts_with("Transient snowline rise"));
    }

    #[test]
    fn elevation_gradient_detected() {
        let analysis = analysis_with(&[
            (ElevationBand::AboveMedian, -0.001),
            (ElevationBand::NearMedian, -0.004),
            (ElevationBand::BelowMedian, -0.009),
        ]);
        let c = compare_elevation_bands(&analysis).unwrap();
        assert!(!c.transient_snowline_pattern);
        assert_eq!(c.pattern, SpatialPattern::ElevationGradient);
        assert!(c.interpretation.starts_with("Enhanced lower-elevation warming"));
    }

    #[test]
    fn missing_near_band_never_transient() {
        // Missing near band counts as 0 in the interpretation, but the flag needs the band.
        let analysis = analysis_with(&[
            (ElevationBand::AboveMedian, 0.002),
            (ElevationBand::BelowMedian, 0.001),
        ]);
        let c = compare_elevation_bands(&analysis).unwrap();
        assert!(!c.transient_snowline_pattern);
        assert!(c.elevation_gradient_pattern);
        assert!(c.interpretation.starts_with("Transient snowline rise"));
    }

    #[test]
    fn uniform_and_complex_patterns() {
        // Near-median slightly steeper still wins as transient snowline.
        let near_steeper = analysis_with(&[
            (ElevationBand::AboveMedian, -0.0050),
            (ElevationBand::NearMedian, -0.0052),
            (ElevationBand::BelowMedian, -0.0049),
        ]);
        let c = compare_elevation_bands(&near_steeper).unwrap();
        assert!(c.transient_snowline_pattern);
        assert_eq!(c.pattern, SpatialPattern::TransientSnowline);

        let uniform = analysis_with(&[
            (ElevationBand::AboveMedian, -0.0050),
            (ElevationBand::NearMedian, -0.0050),
            (ElevationBand::BelowMedian, -0.0049),
        ]);
        let c = compare_elevation_bands(&uniform).unwrap();
        assert!(!c.transient_snowline_pattern);
        assert!(!c.elevation_gradient_pattern);
        assert_eq!(c.pattern, SpatialPattern::Uniform);
        assert!(c.interpretation.starts_with("Uniform glacier-wide decline"));

        let flat_pair = analysis_with(&[
            (ElevationBand::AboveMedian, -0.0050),
            (ElevationBand::BelowMedian, -0.0048),
        ]);
        let c = compare_elevation_bands(&flat_pair).unwrap();
        assert_eq!(c.pattern, SpatialPattern::Uniform);

        let complex = analysis_with(&[
            (ElevationBand::AboveMedian, -0.004),
            (ElevationBand::BelowMedian, 0.003),
        ]);
        let c = compare_elevation_bands(&complex).unwrap();
        assert_eq!(c.pattern, SpatialPattern::Complex);
        assert!(c.interpretation.starts_with("High-elevation sensitivity"));
    }

    #[test]
    fn comparison_needs_two_bands() {
        let analysis = analysis_with(&[(ElevationBand::NearMedian, -0.01)]);
        assert!(compare_elevation_bands(&analysis).is_none());
    }

    #[test]
    fn interpretation_names_strongest_band_when_complex() {
        let mut slopes = BTreeMap::new();
        slopes.insert(ElevationBand::AboveMedian, -0.003);
        slopes.insert(ElevationBand::NearMedian, -0.003);
        slopes.insert(ElevationBand::BelowMedian, 0.001);
        assert_eq!(
            interpret_elevation_pattern(&slopes),
            "Complex pattern (strongest decline: above median)"
        );
        assert_eq!(
            interpret_elevation_pattern(&BTreeMap::new()),
            "Insufficient data for interpretation"
        );
    }
}
