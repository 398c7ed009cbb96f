//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - produced by the pure statistics/analysis code
//! - flattened into CSV rows or dumped as JSON
//! - formatted for the terminal without re-deriving anything

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// p-value cut used for every significance decision.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Minimum series length for a trend to be computed at all.
pub const MIN_TREND_POINTS: usize = 4;

/// Default minimum observations per year for an annual mean to count.
pub const DEFAULT_MIN_OBS_PER_YEAR: usize = 5;

/// Melt season months (June-September).
pub const MELT_SEASON_MONTHS: [u32; 4] = [6, 7, 8, 9];

/// Years with major regional wildfire smoke events.
pub const DEFAULT_FIRE_YEARS: [i32; 4] = [2017, 2018, 2021, 2023];

/// Direction of a monotonic trend as decided by Mann-Kendall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    NoTrend,
}

impl TrendDirection {
    /// Machine-readable label (CSV/JSON).
    pub fn as_str(self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::NoTrend => "no_trend",
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            TrendDirection::Increasing => "Increasing",
            TrendDirection::Decreasing => "Decreasing",
            TrendDirection::NoTrend => "No Trend",
        }
    }
}

/// Mann-Kendall test result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MannKendall {
    pub trend: TrendDirection,
    pub p_value: f64,
    pub tau: f64,
}

impl MannKendall {
    /// Sentinel for series too short (or too degenerate) to test.
    pub fn no_trend() -> Self {
        Self {
            trend: TrendDirection::NoTrend,
            p_value: 1.0,
            tau: 0.0,
        }
    }

    pub fn is_significant(&self) -> bool {
        self.p_value < SIGNIFICANCE_LEVEL
    }
}

/// Sen's slope (Theil-Sen) estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensSlope {
    pub slope_per_year: f64,
    pub intercept: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    Significant,
    /// Same label as `as_str` so JSON and CSV agree.
    #[serde(rename = "not significant")]
    NotSignificant,
}

impl Significance {
    pub fn from_p_value(p_value: f64) -> Self {
        if p_value < SIGNIFICANCE_LEVEL {
            Significance::Significant
        } else {
            Significance::NotSignificant
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Significance::Significant => "significant",
            Significance::NotSignificant => "not significant",
        }
    }
}

/// Combined trend summary for one annual series.
///
/// `change_percent_per_year` and `total_percent_change` are relative to the
/// *first* value of the series, not its mean. A near-zero first year makes
/// both percentages unstable (and a zero first year makes them infinite).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendStatistics {
    pub mann_kendall: MannKendall,
    pub sens_slope: SensSlope,
    pub n_years: usize,
    pub change_per_year: f64,
    pub change_percent_per_year: f64,
    pub total_change: f64,
    pub total_percent_change: f64,
    pub significance: Significance,
    pub period: String,
}

/// Ordinary least-squares line `value = slope * year + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// One per-date, pixel-averaged albedo observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    /// Albedo (dimensionless, 0-1).
    pub value: f64,
    pub pixel_count: Option<u32>,
    /// Elevation in meters (hypsometric runs only).
    pub elevation: Option<f64>,
}

/// Annual aggregate of observations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnualMean {
    pub year: i32,
    pub mean: f64,
    /// Sample standard deviation (NaN for single-observation years).
    pub std: f64,
    pub count: usize,
}

/// Trend over an annual series, plus the series itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnualTrend {
    pub annual: Vec<AnnualMean>,
    pub trend: TrendStatistics,
    pub linear_fit: Option<LinearFit>,
}

/// Trend for a single calendar month across years.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyTrend {
    pub month: u32,
    pub month_name: String,
    pub annual: Vec<AnnualMean>,
    pub trend: TrendStatistics,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FireYearStats {
    pub year: i32,
    pub mean: f64,
    pub std: f64,
    pub count: usize,
}

/// Fire-year vs non-fire-year comparison (Student's t-test, equal variances).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireImpact {
    pub fire_years: Vec<i32>,
    pub fire_mean: f64,
    pub fire_std: f64,
    pub non_fire_mean: f64,
    pub non_fire_std: f64,
    pub difference: f64,
    pub percent_difference: f64,
    pub t_statistic: f64,
    pub p_value: f64,
    pub significant: bool,
    pub fire_year_stats: Vec<FireYearStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryStats {
    pub mean_albedo: f64,
    pub std_albedo: f64,
    pub n_observations: usize,
    pub years_covered: Vec<i32>,
    pub period: String,
    /// Observations per expected melt-season day (122 days per year).
    pub completeness: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeltSeasonAnalysis {
    pub annual: Option<AnnualTrend>,
    pub monthly: Vec<MonthlyTrend>,
    pub fire_impact: Option<FireImpact>,
    pub summary: SummaryStats,
}

/// Elevation band relative to the glacier median elevation (±100 m).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevationBand {
    AboveMedian,
    NearMedian,
    BelowMedian,
}

impl ElevationBand {
    pub const ALL: [ElevationBand; 3] = [
        ElevationBand::AboveMedian,
        ElevationBand::NearMedian,
        ElevationBand::BelowMedian,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ElevationBand::AboveMedian => "above_median",
            ElevationBand::NearMedian => "near_median",
            ElevationBand::BelowMedian => "below_median",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ElevationBand::AboveMedian => "Above Median (>100m)",
            ElevationBand::NearMedian => "Near Median (±100m)",
            ElevationBand::BelowMedian => "Below Median (>100m)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationRange {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

/// Trend results for one elevation band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandTrend {
    pub band: ElevationBand,
    pub band_name: String,
    pub elevation_range: ElevationRange,
    pub n_observations: usize,
    pub annual: Vec<AnnualMean>,
    pub trend: TrendStatistics,
}

/// Per-band trends for a hypsometric run. Bands without enough data are absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypsometricAnalysis {
    pub median_elevation: f64,
    /// Observation count per band (including bands without a trend).
    pub band_counts: BTreeMap<ElevationBand, usize>,
    pub bands: Vec<BandTrend>,
}

impl HypsometricAnalysis {
    pub fn band(&self, band: ElevationBand) -> Option<&BandTrend> {
        self.bands.iter().find(|b| b.band == band)
    }
}

/// Heuristic label for the spatial pattern of band slopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialPattern {
    /// Strongest decline near the median elevation (rising transient snowline).
    TransientSnowline,
    /// Stronger decline below the median than above it.
    ElevationGradient,
    /// All band slopes within `UNIFORM_SLOPE_TOLERANCE` of each other.
    Uniform,
    Complex,
}

impl SpatialPattern {
    pub fn as_str(self) -> &'static str {
        match self {
            SpatialPattern::TransientSnowline => "transient_snowline_pattern",
            SpatialPattern::ElevationGradient => "elevation_gradient_pattern",
            SpatialPattern::Uniform => "uniform",
            SpatialPattern::Complex => "complex",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandComparison {
    pub slopes_by_band: BTreeMap<ElevationBand, f64>,
    pub significance_by_band: BTreeMap<ElevationBand, bool>,
    pub strongest_decline_band: ElevationBand,
    pub strongest_decline_value: f64,
    pub transient_snowline_pattern: bool,
    pub elevation_gradient_pattern: bool,
    pub pattern: SpatialPattern,
    pub interpretation: String,
}

/// One MCD43A3 record: a date and its spectral albedo columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralRecord {
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    /// Band column name (e.g. `Albedo_BSA_vis`) -> albedo.
    pub bands: BTreeMap<String, f64>,
}

impl SpectralRecord {
    pub fn band(&self, name: &str) -> Option<f64> {
        self.bands.get(name).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectralGroup {
    Visible,
    NearInfrared,
    Broadband,
}

impl SpectralGroup {
    pub const ALL: [SpectralGroup; 3] = [
        SpectralGroup::Visible,
        SpectralGroup::NearInfrared,
        SpectralGroup::Broadband,
    ];

    pub fn bands(self) -> &'static [&'static str] {
        match self {
            SpectralGroup::Visible => &[
                "Albedo_BSA_Band1",
                "Albedo_BSA_Band3",
                "Albedo_BSA_Band4",
                "Albedo_BSA_vis",
            ],
            SpectralGroup::NearInfrared => &["Albedo_BSA_Band2", "Albedo_BSA_nir"],
            SpectralGroup::Broadband => &["Albedo_BSA_shortwave"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpectralGroup::Visible => "visible",
            SpectralGroup::NearInfrared => "near_infrared",
            SpectralGroup::Broadband => "broadband",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralBandTrend {
    pub band: String,
    pub mann_kendall: MannKendall,
    pub sens_slope: SensSlope,
    pub change_per_year: f64,
    /// Relative to the first annual value; 0 when that value is not positive.
    pub change_percent_per_year: f64,
    /// `***` when significant, `ns` otherwise.
    pub significance: String,
    pub n_years: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralGroupTrends {
    pub group: SpectralGroup,
    pub trends: Vec<SpectralBandTrend>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectralDominance {
    /// Stronger visible decline: consistent with light-absorbing particles.
    VisibleDominant,
    /// Similar or stronger NIR decline: consistent with grain-size effects.
    NirDominant,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralComparison {
    pub visible_avg_change: f64,
    pub nir_avg_change: f64,
    pub interpretation: SpectralDominance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralTrendAnalysis {
    pub period: String,
    pub n_years: usize,
    pub groups: Vec<SpectralGroupTrends>,
    pub comparison: Option<SpectralComparison>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContaminationKind {
    LowVisNirRatio,
    LowVisibleAlbedo,
}

impl ContaminationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContaminationKind::LowVisNirRatio => "low_vis_nir_ratio",
            ContaminationKind::LowVisibleAlbedo => "low_visible_albedo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Moderate,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Moderate => "moderate",
        }
    }
}

/// A candidate light-absorbing-particle contamination date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContaminationEvent {
    pub date: NaiveDate,
    pub kind: ContaminationKind,
    pub value: f64,
    pub threshold: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthStats {
    pub month: u32,
    pub mean: f64,
    pub std: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalBandStats {
    pub band: String,
    pub monthly: Vec<MonthStats>,
    pub early_season_mean: f64,
    pub late_season_mean: f64,
    pub seasonal_change: f64,
    pub seasonal_change_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalPatterns {
    pub bands: Vec<SeasonalBandStats>,
    pub period: String,
    pub total_observations: usize,
}

/// A full run's configuration as understood by the pipelines.
///
/// This is derived from CLI flags (plus environment defaults).
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub input: PathBuf,
    pub value_column: String,
    pub min_obs_per_year: usize,
    /// Minimum `pixel_count` for an observation to be used (when the column exists).
    pub min_pixels: u32,
    pub output_dir: PathBuf,
    /// Write the CSV artifacts into `output_dir`.
    pub export: bool,
    pub export_json: Option<PathBuf>,
    /// Write SVG figures into `output_dir`.
    pub figure: bool,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub report: Option<PathBuf>,

    pub median_elevation: Option<f64>,
    pub fire_years: Vec<i32>,
    pub months: Vec<u32>,
    pub contamination_percentile: f64,
}
