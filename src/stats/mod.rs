//! Trend statistics core.
//!
//! Everything in here is a pure function over `f64` slices:
//! - `mann_kendall`: monotonic trend test (Kendall tau-b, two-sided p-value)
//! - `sens_slope`: Theil-Sen slope estimate
//! - `trend_statistics`: the two combined with change/percent figures
//! - `descriptive` / `distributions`: helpers shared with the analyses

use thiserror::Error;

pub mod descriptive;
pub mod distributions;
pub mod mann_kendall;
pub mod sens_slope;
pub mod trend;

pub use mann_kendall::*;
pub use sens_slope::*;
pub use trend::*;

/// Degenerate inputs the statistics core refuses to summarize.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("cannot compute trend statistics on an empty series")]
    EmptySeries,
    #[error("values and years differ in length ({values} vs {years})")]
    LengthMismatch { values: usize, years: usize },
}
