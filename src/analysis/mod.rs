//! Glacier-level analyses built on the statistics core.
//!
//! - `temporal`: annual/monthly trends, fire-year impact, melt season summary
//! - `hypsometric`: elevation-band classification, band trends and comparison
//! - `spectral`: MCD43A3 band trends, seasonal patterns, contamination events

pub mod hypsometric;
pub mod spectral;
pub mod temporal;
