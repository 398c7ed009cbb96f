//! Command-line parsing for the Athabasca albedo trend toolkit.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! analysis code. Flags are turned into an `AnalysisConfig` by `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::analysis::spectral::DEFAULT_CONTAMINATION_PERCENTILE;
use crate::domain::{DEFAULT_FIRE_YEARS, DEFAULT_MIN_OBS_PER_YEAR};
use crate::io::ingest::{DEFAULT_MIN_PIXELS, DEFAULT_VALUE_COLUMN};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "albedo", version, about = "Athabasca Glacier MODIS albedo trend toolkit")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log filter used when `RUST_LOG` is unset (e.g. `info`, `albedo=debug`).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Mann-Kendall + Sen's slope on a series given on the command line.
    Trend(TrendArgs),
    /// Annual mean albedo trend from a per-date observation CSV.
    Annual(AnnualArgs),
    /// Melt-season analysis: annual and monthly trends plus fire-year impact.
    MeltSeason(MeltSeasonArgs),
    /// Elevation band trends and the spatial pattern they form.
    Hypsometric(HypsometricArgs),
    /// Spectral band trends, seasonal patterns and contamination events (MCD43A3).
    Spectral(SpectralArgs),
    /// Write a synthetic, ingest-compatible observation CSV.
    Simulate(SimulateArgs),
}

#[derive(Debug, Args, Clone)]
pub struct TrendArgs {
    /// Annual values in chronological order, comma separated.
    #[arg(long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
    pub values: Vec<f64>,

    /// Year of each value, comma separated (defaults to consecutive years from `--first-year`).
    #[arg(long, value_delimiter = ',')]
    pub years: Option<Vec<i32>>,

    /// First year when `--years` is not given.
    #[arg(long, default_value_t = 1)]
    pub first_year: i32,

    /// Write the trend statistics to JSON.
    #[arg(long)]
    pub export_json: Option<PathBuf>,
}

/// Input options shared by the observation-based commands.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Per-date observation CSV (`date`, value column, optional `pixel_count`/`elevation`).
    #[arg(short = 'i', long, value_name = "CSV")]
    pub input: PathBuf,

    /// Column holding the albedo value.
    #[arg(long, default_value = DEFAULT_VALUE_COLUMN)]
    pub value_column: String,

    /// Minimum observations for a year to count in the annual series.
    #[arg(long, default_value_t = DEFAULT_MIN_OBS_PER_YEAR)]
    pub min_obs_per_year: usize,

    /// Drop dates whose mean is backed by fewer glacier pixels than this.
    #[arg(long, default_value_t = DEFAULT_MIN_PIXELS)]
    pub min_pixels: u32,
}

/// Output options shared by every analysis command.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Directory for CSV exports and figures.
    #[arg(long, env = "ALBEDO_OUTPUT_DIR", default_value = "outputs")]
    pub output_dir: PathBuf,

    /// Write the CSV artifacts into the output directory.
    #[arg(long)]
    pub export: bool,

    /// Dump the whole analysis result to JSON.
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Write SVG figures into the output directory.
    #[arg(long)]
    pub figure: bool,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 18)]
    pub height: usize,

    /// Also write the terminal report to this text file.
    #[arg(long, value_name = "TXT")]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct AnnualArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Keep only these months (comma separated, e.g. `6,7,8,9`).
    #[arg(long, value_delimiter = ',')]
    pub months: Vec<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct MeltSeasonArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Years with major wildfire smoke events.
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_FIRE_YEARS.to_vec())]
    pub fire_years: Vec<i32>,
}

#[derive(Debug, Args, Clone)]
pub struct HypsometricArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Glacier median elevation in meters (computed from the data when omitted).
    #[arg(long)]
    pub median_elevation: Option<f64>,
}

#[derive(Debug, Args, Clone)]
pub struct SpectralArgs {
    /// MCD43A3 CSV with `date` and `Albedo_BSA_*` columns.
    #[arg(short = 'i', long, value_name = "CSV")]
    pub input: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Percentile below which a date is flagged as possibly contaminated.
    #[arg(long, default_value_t = DEFAULT_CONTAMINATION_PERCENTILE)]
    pub percentile: f64,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Destination CSV.
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: PathBuf,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 2010)]
    pub first_year: i32,

    #[arg(long, default_value_t = 2024)]
    pub last_year: i32,

    /// Imposed albedo decline per year.
    #[arg(long, default_value_t = 0.004, allow_negative_numbers = true)]
    pub annual_decline: f64,

    /// Standard deviation of the per-date noise.
    #[arg(long, default_value_t = 0.03)]
    pub noise: f64,

    /// Fraction of melt-season days with a clear-sky observation.
    #[arg(long, default_value_t = 0.35)]
    pub coverage: f64,

    /// Emit one row per elevation band with an `elevation` column.
    #[arg(long)]
    pub with_elevation: bool,

    /// Median elevation used for the synthetic bands (meters).
    #[arg(long, default_value_t = 2400.0)]
    pub median_elevation: f64,
}
