//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - trend test outputs (`MannKendall`, `SensSlope`, `TrendStatistics`)
//! - observations and annual aggregates (`Observation`, `AnnualMean`)
//! - hypsometric and spectral analysis results
//! - the run configuration (`AnalysisConfig`)

pub mod types;

pub use types::*;
