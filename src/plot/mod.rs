//! Figures: ASCII plots for the terminal and SVG files via Plotters.

pub mod ascii;
pub mod svg;

pub use ascii::render_annual_plot;
pub use svg::{write_annual_svg, write_hypsometric_svg};
