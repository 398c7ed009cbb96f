//! Shared analysis pipelines.
//!
//! Each pipeline is ingest -> analysis and returns everything the front-end
//! needs for printing, exporting and plotting. Nothing here prints.

use tracing::{debug, info, warn};

use crate::analysis::hypsometric::{analyze_hypsometric_trends, compare_elevation_bands};
use crate::analysis::spectral::{
    analyze_seasonal_patterns, analyze_spectral_trends, detect_contamination_events,
};
use crate::analysis::temporal::{analyze_annual_trends, analyze_melt_season};
use crate::domain::{
    AnalysisConfig, AnnualTrend, BandComparison, ContaminationEvent, HypsometricAnalysis,
    MELT_SEASON_MONTHS, MeltSeasonAnalysis, SeasonalPatterns, SpectralTrendAnalysis,
};
use crate::error::AppError;
use crate::io::ingest::{
    IngestOptions, IngestedObservations, IngestedSpectral, load_observations, load_spectral_records,
};

/// Outputs of `albedo annual`.
#[derive(Debug, Clone)]
pub struct AnnualRun {
    pub ingest: IngestedObservations,
    pub trend: AnnualTrend,
}

/// Outputs of `albedo melt-season`.
#[derive(Debug, Clone)]
pub struct MeltSeasonRun {
    pub ingest: IngestedObservations,
    pub analysis: MeltSeasonAnalysis,
}

/// Outputs of `albedo hypsometric`.
#[derive(Debug, Clone)]
pub struct HypsometricRun {
    pub ingest: IngestedObservations,
    pub analysis: HypsometricAnalysis,
    pub comparison: Option<BandComparison>,
}

/// Outputs of `albedo spectral`.
#[derive(Debug, Clone)]
pub struct SpectralRun {
    pub ingest: IngestedSpectral,
    pub trends: Option<SpectralTrendAnalysis>,
    pub seasonal: Option<SeasonalPatterns>,
    pub events: Vec<ContaminationEvent>,
}

fn ingest_options(config: &AnalysisConfig, months: Vec<u32>, require_elevation: bool) -> IngestOptions {
    IngestOptions {
        value_column: config.value_column.clone(),
        min_pixels: config.min_pixels,
        require_elevation,
        months,
    }
}

fn load(config: &AnalysisConfig, options: &IngestOptions) -> Result<IngestedObservations, AppError> {
    let ingest = load_observations(&config.input, options)?;
    info!(
        input = %config.input.display(),
        rows = ingest.rows_read,
        used = ingest.observations.len(),
        filtered = ingest.rows_filtered,
        "loaded observations"
    );
    for e in &ingest.row_errors {
        warn!(line = e.line, "skipped row: {}", e.message);
    }
    Ok(ingest)
}

pub fn run_annual(config: &AnalysisConfig) -> Result<AnnualRun, AppError> {
    let ingest = load(config, &ingest_options(config, config.months.clone(), false))?;

    let trend = analyze_annual_trends(&ingest.observations, config.min_obs_per_year)?.ok_or_else(|| {
        AppError::insufficient(format!(
            "Need at least 4 years with >= {} observations for an annual trend.",
            config.min_obs_per_year
        ))
    })?;
    debug!(years = trend.annual.len(), "annual series built");

    Ok(AnnualRun { ingest, trend })
}

/// Melt season analysis on June-September observations.
pub fn run_melt_season(config: &AnalysisConfig) -> Result<MeltSeasonRun, AppError> {
    let ingest = load(config, &ingest_options(config, MELT_SEASON_MONTHS.to_vec(), false))?;

    let analysis = analyze_melt_season(&ingest.observations, config.min_obs_per_year, &config.fire_years)?;
    if analysis.annual.is_none() {
        warn!("not enough years for an annual melt-season trend");
    }
    for month in MELT_SEASON_MONTHS {
        if !analysis.monthly.iter().any(|m| m.month == month) {
            warn!(month, "not enough years for a monthly trend");
        }
    }
    if analysis.fire_impact.is_none() {
        warn!(fire_years = ?config.fire_years, "fire impact skipped: one group has no observations");
    }

    Ok(MeltSeasonRun { ingest, analysis })
}

pub fn run_hypsometric(config: &AnalysisConfig) -> Result<HypsometricRun, AppError> {
    let ingest = load(config, &ingest_options(config, config.months.clone(), true))?;

    let analysis =
        analyze_hypsometric_trends(&ingest.observations, config.median_elevation, config.min_obs_per_year)?
            .ok_or_else(|| AppError::insufficient("No elevation data to classify into bands."))?;
    info!(median_elevation = analysis.median_elevation, "classified elevation bands");

    for (band, count) in &analysis.band_counts {
        if analysis.band(*band).is_none() {
            warn!(band = band.as_str(), observations = count, "band skipped: fewer than 4 usable years");
        }
    }
    if analysis.bands.is_empty() {
        return Err(AppError::insufficient("No elevation band has enough years for a trend."));
    }

    let comparison = compare_elevation_bands(&analysis);
    if comparison.is_none() {
        warn!("band comparison needs at least two bands with trends");
    }

    Ok(HypsometricRun {
        ingest,
        analysis,
        comparison,
    })
}

pub fn run_spectral(config: &AnalysisConfig) -> Result<SpectralRun, AppError> {
    let ingest = load_spectral_records(&config.input)?;
    info!(
        input = %config.input.display(),
        rows = ingest.rows_read,
        records = ingest.records.len(),
        bands = ingest.band_names.len(),
        "loaded spectral records"
    );
    for e in &ingest.row_errors {
        warn!(line = e.line, "skipped row: {}", e.message);
    }

    let trends = analyze_spectral_trends(&ingest.records);
    if trends.is_none() {
        warn!("spectral trends skipped: no band has 4 or more years");
    }
    let seasonal = analyze_seasonal_patterns(&ingest.records);
    let events = detect_contamination_events(&ingest.records, config.contamination_percentile);
    debug!(events = events.len(), "contamination screening done");

    Ok(SpectralRun {
        ingest,
        trends,
        seasonal,
        events,
    })
}
