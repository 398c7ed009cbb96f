//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - runs the analysis pipelines
//! - prints reports/plots
//! - writes optional exports, figures and report files

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::analysis::spectral::DEFAULT_CONTAMINATION_PERCENTILE;
use crate::cli::{
    AnnualArgs, Command, HypsometricArgs, InputArgs, MeltSeasonArgs, OutputArgs, SimulateArgs,
    SpectralArgs, TrendArgs,
};
use crate::data::synthetic::{SyntheticConfig, generate_observations, write_observations_csv};
use crate::domain::{
    AnalysisConfig, BandComparison, ContaminationEvent, DEFAULT_FIRE_YEARS,
    DEFAULT_MIN_OBS_PER_YEAR, HypsometricAnalysis, SeasonalPatterns, SpectralTrendAnalysis,
    TrendStatistics,
};
use crate::error::AppError;
use crate::io::export::{
    artifact_path, write_annual_csv, write_contamination_csv, write_hypsometric_csv,
    write_trend_results_csv,
};
use crate::io::ingest::{DEFAULT_MIN_PIXELS, DEFAULT_VALUE_COLUMN, IngestedObservations};
use crate::io::report_json::write_analysis_json;
use crate::plot::{render_annual_plot, write_annual_svg, write_hypsometric_svg};
use crate::report::{
    format_annual_trend, format_hypsometric, format_ingest_summary, format_melt_season,
    format_spectral, format_trend_statistics, write_text_report,
};
use crate::stats::trend_statistics;

pub mod pipeline;

/// Entry point for the `albedo` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine.
    dotenvy::dotenv().ok();

    let cli = crate::cli::Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Command::Trend(args) => handle_trend(args),
        Command::Annual(args) => handle_annual(args),
        Command::MeltSeason(args) => handle_melt_season(args),
        Command::Hypsometric(args) => handle_hypsometric(args),
        Command::Spectral(args) => handle_spectral(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

/// `RUST_LOG` wins over `--log-level`. Logs go to stderr, reports to stdout.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    // Already initialised (tests, embedding) is not an error.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_trend(args: TrendArgs) -> Result<(), AppError> {
    let years = trend_years(&args)?;
    let stats = trend_statistics(&args.values, &years)?;

    println!("=== Trend statistics ===\n{}", format_trend_statistics(&stats));

    if let Some(path) = &args.export_json {
        write_analysis_json(path, "trend", Path::new("<command line>"), &stats)?;
        info!(path = %path.display(), "wrote trend JSON");
    }
    Ok(())
}

fn trend_years(args: &TrendArgs) -> Result<Vec<i32>, AppError> {
    match &args.years {
        Some(years) if years.len() != args.values.len() => Err(AppError::input(format!(
            "--years has {} entries but --values has {}.",
            years.len(),
            args.values.len()
        ))),
        Some(years) => Ok(years.clone()),
        None => Ok((args.first_year..).take(args.values.len()).collect()),
    }
}

fn handle_annual(args: AnnualArgs) -> Result<(), AppError> {
    let config = AnalysisConfig {
        months: args.months.clone(),
        ..analysis_config_from_args(&args.input, &args.output)
    };
    let run = pipeline::run_annual(&config)?;

    let mut sections = vec![
        ingest_section(&config, &run.ingest),
        format_annual_trend("Annual albedo trend", &run.trend),
    ];
    if config.plot {
        sections.push(render_annual_plot(
            &run.trend.annual,
            Some(&run.trend.trend.sens_slope),
            config.plot_width,
            config.plot_height,
        ));
    }
    emit(&config, "annual trend", &sections)?;

    if config.export {
        let dir = ensure_output_dir(&config)?;
        let data = artifact_path(&dir, "annual", "data");
        write_annual_csv(&data, &run.trend.annual)?;
        let results = artifact_path(&dir, "annual", "results");
        write_trend_results_csv(&results, &[("annual".to_string(), &run.trend.trend)])?;
        info!(data = %data.display(), results = %results.display(), "wrote annual exports");
    }
    if config.figure {
        let dir = ensure_output_dir(&config)?;
        let path = dir.join("athabasca_annual_trend.svg");
        write_annual_svg(&path, "Athabasca Glacier annual albedo", &run.trend)?;
        info!(path = %path.display(), "wrote figure");
    }
    if let Some(path) = &config.export_json {
        write_analysis_json(path, "annual", &config.input, &run.trend)?;
        info!(path = %path.display(), "wrote JSON");
    }
    Ok(())
}

fn handle_melt_season(args: MeltSeasonArgs) -> Result<(), AppError> {
    let config = AnalysisConfig {
        fire_years: args.fire_years.clone(),
        ..analysis_config_from_args(&args.input, &args.output)
    };
    let run = pipeline::run_melt_season(&config)?;
    let analysis = &run.analysis;

    let mut sections = vec![ingest_section(&config, &run.ingest), format_melt_season(analysis)];
    if let (true, Some(annual)) = (config.plot, &analysis.annual) {
        sections.push(render_annual_plot(
            &annual.annual,
            Some(&annual.trend.sens_slope),
            config.plot_width,
            config.plot_height,
        ));
    }
    emit(&config, "melt season", &sections)?;

    if config.export {
        let dir = ensure_output_dir(&config)?;
        let mut rows: Vec<(String, &TrendStatistics)> = Vec::new();
        if let Some(annual) = &analysis.annual {
            write_annual_csv(&artifact_path(&dir, "melt_season", "data"), &annual.annual)?;
            rows.push(("annual".to_string(), &annual.trend));
        }
        for m in &analysis.monthly {
            rows.push((format!("monthly_{}", m.month_name.to_lowercase()), &m.trend));
        }
        let results = artifact_path(&dir, "melt_season", "results");
        write_trend_results_csv(&results, &rows)?;
        info!(dir = %dir.display(), trends = rows.len(), "wrote melt season exports");
    }
    if let (true, Some(annual)) = (config.figure, &analysis.annual) {
        let dir = ensure_output_dir(&config)?;
        let path = dir.join("athabasca_melt_season_trend.svg");
        write_annual_svg(&path, "Athabasca Glacier melt-season albedo", annual)?;
        info!(path = %path.display(), "wrote figure");
    }
    if let Some(path) = &config.export_json {
        write_analysis_json(path, "melt_season", &config.input, analysis)?;
        info!(path = %path.display(), "wrote JSON");
    }
    Ok(())
}

#[derive(Serialize)]
struct HypsometricResult<'a> {
    analysis: &'a HypsometricAnalysis,
    comparison: Option<&'a BandComparison>,
}

fn handle_hypsometric(args: HypsometricArgs) -> Result<(), AppError> {
    let config = AnalysisConfig {
        median_elevation: args.median_elevation,
        ..analysis_config_from_args(&args.input, &args.output)
    };
    let run = pipeline::run_hypsometric(&config)?;

    let mut sections = vec![
        ingest_section(&config, &run.ingest),
        format_hypsometric(&run.analysis, run.comparison.as_ref()),
    ];
    if config.plot {
        for band in &run.analysis.bands {
            let plot = render_annual_plot(
                &band.annual,
                Some(&band.trend.sens_slope),
                config.plot_width,
                config.plot_height,
            );
            sections.push(format!("{}\n{plot}", band.band_name));
        }
    }
    emit(&config, "hypsometric", &sections)?;

    if config.export {
        let dir = ensure_output_dir(&config)?;
        let path = artifact_path(&dir, "hypsometric", "results");
        write_hypsometric_csv(&path, &run.analysis)?;
        info!(path = %path.display(), "wrote hypsometric export");
    }
    if config.figure {
        let dir = ensure_output_dir(&config)?;
        let path = dir.join("athabasca_hypsometric_trends.svg");
        write_hypsometric_svg(&path, &run.analysis)?;
        info!(path = %path.display(), "wrote figure");
    }
    if let Some(path) = &config.export_json {
        let result = HypsometricResult {
            analysis: &run.analysis,
            comparison: run.comparison.as_ref(),
        };
        write_analysis_json(path, "hypsometric", &config.input, &result)?;
        info!(path = %path.display(), "wrote JSON");
    }
    Ok(())
}

#[derive(Serialize)]
struct SpectralResult<'a> {
    trends: Option<&'a SpectralTrendAnalysis>,
    seasonal: Option<&'a SeasonalPatterns>,
    contamination_events: &'a [ContaminationEvent],
}

fn handle_spectral(args: SpectralArgs) -> Result<(), AppError> {
    let config = AnalysisConfig {
        input: args.input.clone(),
        contamination_percentile: args.percentile,
        ..output_config(&args.output)
    };
    if !(0.0..=100.0).contains(&config.contamination_percentile) {
        return Err(AppError::input("--percentile must be between 0 and 100."));
    }
    let run = pipeline::run_spectral(&config)?;

    let ingest = format_ingest_summary(
        &config.input.display().to_string(),
        run.ingest.rows_read,
        run.ingest.records.len(),
        0,
        &run.ingest.row_errors,
    );
    let body = format_spectral(
        run.trends.as_ref(),
        run.seasonal.as_ref(),
        &run.ingest.records,
        &run.events,
    );
    emit(&config, "spectral", &[ingest, body])?;

    if config.export {
        let dir = ensure_output_dir(&config)?;
        let path = artifact_path(&dir, "contamination", "events");
        write_contamination_csv(&path, &run.events)?;
        info!(path = %path.display(), events = run.events.len(), "wrote contamination events");
    }
    if let Some(path) = &config.export_json {
        let result = SpectralResult {
            trends: run.trends.as_ref(),
            seasonal: run.seasonal.as_ref(),
            contamination_events: &run.events,
        };
        write_analysis_json(path, "spectral", &config.input, &result)?;
        info!(path = %path.display(), "wrote JSON");
    }
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let config = SyntheticConfig {
        first_year: args.first_year,
        last_year: args.last_year,
        annual_decline: args.annual_decline,
        noise_std: args.noise,
        coverage: args.coverage,
        with_elevation: args.with_elevation,
        median_elevation: args.median_elevation,
        seed: args.seed,
        ..SyntheticConfig::default()
    };
    let observations = generate_observations(&config)?;
    write_observations_csv(&args.output, &observations)?;
    info!(path = %args.output.display(), seed = config.seed, "wrote synthetic observations");

    println!(
        "Wrote {} observations ({}-{}) to {}",
        observations.len(),
        config.first_year,
        config.last_year,
        args.output.display()
    );
    Ok(())
}

/// Output-side settings, with neutral analysis defaults.
fn output_config(output: &OutputArgs) -> AnalysisConfig {
    AnalysisConfig {
        input: PathBuf::new(),
        value_column: DEFAULT_VALUE_COLUMN.to_string(),
        min_obs_per_year: DEFAULT_MIN_OBS_PER_YEAR,
        min_pixels: DEFAULT_MIN_PIXELS,
        output_dir: output.output_dir.clone(),
        export: output.export,
        export_json: output.export_json.clone(),
        figure: output.figure,
        plot: output.plot && !output.no_plot,
        plot_width: output.width,
        plot_height: output.height,
        report: output.report.clone(),
        median_elevation: None,
        fire_years: DEFAULT_FIRE_YEARS.to_vec(),
        months: Vec::new(),
        contamination_percentile: DEFAULT_CONTAMINATION_PERCENTILE,
    }
}

pub fn analysis_config_from_args(input: &InputArgs, output: &OutputArgs) -> AnalysisConfig {
    AnalysisConfig {
        input: input.input.clone(),
        value_column: input.value_column.clone(),
        min_obs_per_year: input.min_obs_per_year,
        min_pixels: input.min_pixels,
        ..output_config(output)
    }
}

fn ingest_section(config: &AnalysisConfig, ingest: &IngestedObservations) -> String {
    format_ingest_summary(
        &config.input.display().to_string(),
        ingest.rows_read,
        ingest.observations.len(),
        ingest.rows_filtered,
        &ingest.row_errors,
    )
}

/// Print the report sections and mirror them into the report file if asked.
fn emit(config: &AnalysisConfig, title: &str, sections: &[String]) -> Result<(), AppError> {
    for section in sections {
        println!("{section}");
    }
    if let Some(path) = &config.report {
        write_text_report(path, title, &config.input, sections)?;
        info!(path = %path.display(), "wrote text report");
    }
    Ok(())
}

fn ensure_output_dir(config: &AnalysisConfig) -> Result<PathBuf, AppError> {
    fs::create_dir_all(&config.output_dir).map_err(|e| {
        AppError::input(format!(
            "Failed to create output directory '{}': {e}",
            config.output_dir.display()
        ))
    })?;
    Ok(config.output_dir.clone())
}
