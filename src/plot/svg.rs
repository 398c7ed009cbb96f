//! Static SVG figures rendered with Plotters.
//!
//! Drawing is generic over the Plotters backend so the figures can be
//! rendered into a string in tests and into a file from the CLI.

use std::path::Path;

use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;

use crate::domain::{AnnualMean, AnnualTrend, ElevationBand, HypsometricAnalysis, SensSlope};
use crate::error::AppError;

pub const DEFAULT_FIGURE_SIZE: (u32, u32) = (960, 600);

type DrawResult<DB> = Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

fn band_color(band: ElevationBand) -> RGBColor {
    match band {
        ElevationBand::AboveMedian => RGBColor(31, 119, 180),
        ElevationBand::NearMedian => RGBColor(214, 39, 40),
        ElevationBand::BelowMedian => RGBColor(44, 160, 44),
    }
}

fn sens_line(annual: &[AnnualMean], sens: &SensSlope) -> Vec<(f64, f64)> {
    annual
        .iter()
        .enumerate()
        .map(|(i, a)| (f64::from(a.year), sens.intercept + sens.slope_per_year * i as f64))
        .collect()
}

/// Padded `(x, y)` bounds over every plotted value.
fn bounds<'a>(series: impl Iterator<Item = &'a (f64, f64)>) -> ((f64, f64), (f64, f64)) {
    let mut x = (f64::INFINITY, f64::NEG_INFINITY);
    let mut y = (f64::INFINITY, f64::NEG_INFINITY);
    for &(px, py) in series.filter(|(px, py)| px.is_finite() && py.is_finite()) {
        x = (x.0.min(px), x.1.max(px));
        y = (y.0.min(py), y.1.max(py));
    }
    if !(x.0.is_finite() && y.0.is_finite()) {
        return ((0.0, 1.0), (0.0, 1.0));
    }
    let pad = ((y.1 - y.0) * 0.1).max(0.01);
    ((x.0 - 0.5, x.1 + 0.5), (y.0 - pad, y.1 + pad))
}

fn draw_annual<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, title: &str, trend: &AnnualTrend) -> DrawResult<DB> {
    let points: Vec<(f64, f64)> = trend.annual.iter().map(|a| (f64::from(a.year), a.mean)).collect();
    let sens = sens_line(&trend.annual, &trend.trend.sens_slope);
    let ((x0, x1), (y0, y1)) = bounds(points.iter().chain(&sens));

    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("Albedo")
        .x_labels(10)
        .y_labels(8)
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&|v| format!("{v:.2}"))
        .draw()?;

    chart
        .draw_series(points.iter().map(|&p| Circle::new(p, 4, BLUE.filled())))?
        .label("Annual mean")
        .legend(|(x, y)| Circle::new((x + 10, y), 4, BLUE.filled()));

    chart
        .draw_series(LineSeries::new(sens.iter().copied(), RED.stroke_width(2)))?
        .label(format!(
            "Sen's slope ({:+.4}/yr, p={:.3})",
            trend.trend.sens_slope.slope_per_year, trend.trend.mann_kendall.p_value
        ))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    if let Some(fit) = &trend.linear_fit {
        let (a, b) = (x0 + 0.5, x1 - 0.5);
        chart
            .draw_series(LineSeries::new(
                [(a, fit.predict(a)), (b, fit.predict(b))],
                BLACK.mix(0.5),
            ))?
            .label(format!("Linear fit (R²={:.2})", fit.r_squared))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.mix(0.5)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()
}

fn draw_hypsometric<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, analysis: &HypsometricAnalysis) -> DrawResult<DB> {
    let series: Vec<(ElevationBand, Vec<(f64, f64)>, Vec<(f64, f64)>)> = analysis
        .bands
        .iter()
        .map(|b| {
            let points = b.annual.iter().map(|a| (f64::from(a.year), a.mean)).collect();
            (b.band, points, sens_line(&b.annual, &b.trend.sens_slope))
        })
        .collect();
    let ((x0, x1), (y0, y1)) = bounds(series.iter().flat_map(|(_, p, s)| p.iter().chain(s)));

    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(root)
        .caption(
            format!("Albedo by elevation band (median {:.0} m)", analysis.median_elevation),
            ("sans-serif", 22),
        )
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("Albedo")
        .x_labels(10)
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&|v| format!("{v:.2}"))
        .draw()?;

    for (band, points, sens) in &series {
        let color = band_color(*band);
        chart.draw_series(points.iter().map(|&p| Circle::new(p, 3, color.filled())))?;
        chart
            .draw_series(LineSeries::new(sens.iter().copied(), color.stroke_width(2)))?
            .label(band.display_name())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()
}

fn render_error(path: &Path, err: impl std::fmt::Display) -> AppError {
    AppError::new(4, format!("Failed to render figure '{}': {err}", path.display()))
}

/// Annual means with Sen's slope and OLS lines.
pub fn write_annual_svg(path: &Path, title: &str, trend: &AnnualTrend) -> Result<(), AppError> {
    let root = SVGBackend::new(path, DEFAULT_FIGURE_SIZE).into_drawing_area();
    draw_annual(&root, title, trend).map_err(|e| render_error(path, e))
}

/// One series (annual means + Sen's line) per elevation band.
pub fn write_hypsometric_svg(path: &Path, analysis: &HypsometricAnalysis) -> Result<(), AppError> {
    let root = SVGBackend::new(path, DEFAULT_FIGURE_SIZE).into_drawing_area();
    draw_hypsometric(&root, analysis).map_err(|e| render_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::temporal::trend_over_annual;
    use std::collections::BTreeMap;

    fn sample_trend() -> AnnualTrend {
        let annual = (2015..=2024)
            .map(|year| AnnualMean {
                year,
                mean: 0.60 - 0.01 * f64::from(year - 2015),
                std: 0.02,
                count: 20,
            })
            .collect();
        trend_over_annual(annual).unwrap().unwrap()
    }

    #[test]
    fn annual_figure_renders_to_svg() {
        let trend = sample_trend();
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (640, 400)).into_drawing_area();
            draw_annual(&root, "Annual albedo", &trend).unwrap();
        }
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Annual mean"));
        assert!(svg.matches("<circle").count() >= trend.annual.len());
    }

    #[test]
    fn hypsometric_figure_renders_each_band() {
        let trend = sample_trend();
        let analysis = HypsometricAnalysis {
            median_elevation: 2400.0,
            band_counts: BTreeMap::new(),
            bands: [ElevationBand::NearMedian, ElevationBand::BelowMedian]
                .into_iter()
                .map(|band| crate::domain::BandTrend {
                    band,
                    band_name: band.display_name().to_string(),
                    elevation_range: crate::domain::ElevationRange {
                        min: 2300.0,
                        max: 2500.0,
                        mean: 2400.0,
                        median: 2400.0,
                    },
                    n_observations: 200,
                    annual: trend.annual.clone(),
                    trend: trend.trend.clone(),
                })
                .collect(),
        };
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (640, 400)).into_drawing_area();
            draw_hypsometric(&root, &analysis).unwrap();
        }
        assert!(svg.contains("median 2400 m"));
        assert!(svg.contains("Near Median"));
        assert!(svg.contains("Below Median"));
    }

    #[test]
    fn file_output_reports_render_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annual.svg");
        write_annual_svg(&path, "Annual albedo", &sample_trend()).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<svg"));

        let bad = dir.path().join("missing").join("annual.svg");
        assert_eq!(write_annual_svg(&bad, "x", &sample_trend()).unwrap_err().exit_code(), 4);
    }
}
