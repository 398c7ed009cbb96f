//! Export analysis results to CSV.
//!
//! The files are meant to be easy to consume in spreadsheets or downstream
//! scripts. Non-finite numbers are written as empty cells.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::domain::{AnnualMean, ContaminationEvent, HypsometricAnalysis, TrendStatistics};
use crate::error::AppError;

/// `<dir>/athabasca_<analysis>_<kind>.csv`
pub fn artifact_path(dir: &Path, analysis: &str, kind: &str) -> PathBuf {
    dir.join(format!("athabasca_{analysis}_{kind}.csv"))
}

fn create(path: &Path) -> Result<BufWriter<File>, AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    Ok(BufWriter::new(file))
}

fn write_err(path: &Path) -> impl Fn(std::io::Error) -> AppError + '_ {
    move |e| AppError::input(format!("Failed to write export CSV '{}': {e}", path.display()))
}

fn num(v: f64, decimals: usize) -> String {
    if v.is_finite() {
        format!("{v:.decimals$}")
    } else {
        String::new()
    }
}

/// Annual means: `year,mean,std,count`.
pub fn write_annual_csv(path: &Path, annual: &[AnnualMean]) -> Result<(), AppError> {
    let mut out = create(path)?;
    let err = write_err(path);

    writeln!(out, "year,mean,std,count").map_err(&err)?;
    for a in annual {
        writeln!(out, "{},{},{},{}", a.year, num(a.mean, 6), num(a.std, 6), a.count).map_err(&err)?;
    }
    out.flush().map_err(&err)
}

/// One row per labelled trend.
pub fn write_trend_results_csv(path: &Path, rows: &[(String, &TrendStatistics)]) -> Result<(), AppError> {
    let mut out = create(path)?;
    let err = write_err(path);

    writeln!(
        out,
        "analysis_type,period,trend,p_value,tau,sens_slope_per_year,intercept,\
         percent_change_per_year,total_change,total_percent_change,significance,n_years"
    )
    .map_err(&err)?;

    for (label, t) in rows {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            label,
            t.period,
            t.mann_kendall.trend.as_str(),
            num(t.mann_kendall.p_value, 6),
            num(t.mann_kendall.tau, 6),
            num(t.sens_slope.slope_per_year, 6),
            num(t.sens_slope.intercept, 6),
            num(t.change_percent_per_year, 4),
            num(t.total_change, 6),
            num(t.total_percent_change, 4),
            t.significance.as_str(),
            t.n_years,
        )
        .map_err(&err)?;
    }
    out.flush().map_err(&err)
}

/// One row per elevation band that produced a trend.
pub fn write_hypsometric_csv(path: &Path, analysis: &HypsometricAnalysis) -> Result<(), AppError> {
    let mut out = create(path)?;
    let err = write_err(path);

    writeln!(
        out,
        "elevation_band,band_name,elevation_min,elevation_max,n_observations,trend,p_value,\
         sens_slope_per_year,percent_change_per_year,total_change,significance"
    )
    .map_err(&err)?;

    for b in &analysis.bands {
        let t = &b.trend;
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{}",
            b.band.as_str(),
            b.band_name,
            num(b.elevation_range.min, 1),
            num(b.elevation_range.max, 1),
            b.n_observations,
            t.mann_kendall.trend.as_str(),
            num(t.mann_kendall.p_value, 6),
            num(t.sens_slope.slope_per_year, 6),
            num(t.change_percent_per_year, 4),
            num(t.total_change, 6),
            t.significance.as_str(),
        )
        .map_err(&err)?;
    }
    out.flush().map_err(&err)
}

/// Contamination events: `date,type,value,threshold,severity`.
pub fn write_contamination_csv(path: &Path, events: &[ContaminationEvent]) -> Result<(), AppError> {
    let mut out = create(path)?;
    let err = write_err(path);

    writeln!(out, "date,type,value,threshold,severity").map_err(&err)?;
    for e in events {
        writeln!(
            out,
            "{},{},{},{},{}",
            e.date,
            e.kind.as_str(),
            num(e.value, 6),
            num(e.threshold, 6),
            e.severity.as_str(),
        )
        .map_err(&err)?;
    }
    out.flush().map_err(&err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContaminationKind, Severity};
    use crate::stats::trend_statistics;
    use chrono::NaiveDate;

    #[test]
    fn artifact_names_follow_convention() {
        let p = artifact_path(Path::new("outputs"), "melt_season", "results");
        assert_eq!(p, Path::new("outputs/athabasca_melt_season_results.csv"));
    }

    #[test]
    fn annual_csv_blanks_missing_std() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annual.csv");
        let annual = [
            AnnualMean { year: 2020, mean: 0.5, std: f64::NAN, count: 1 },
            AnnualMean { year: 2021, mean: 0.45, std: 0.01, count: 6 },
        ];
        write_annual_csv(&path, &annual).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "year,mean,std,count");
        assert_eq!(lines[1], "2020,0.500000,,1");
        assert_eq!(lines[2], "2021,0.450000,0.010000,6");
    }

    #[test]
    fn trend_results_csv_has_one_row_per_trend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let stats = trend_statistics(&[0.6, 0.58, 0.55, 0.5, 0.49], &[2016, 2017, 2018, 2019, 2020]).unwrap();
        write_trend_results_csv(&path, &[("annual".to_string(), &stats), ("july".to_string(), &stats)])
            .unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 12);
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "annual");
        assert_eq!(&rows[0][1], "2016-2020");
        assert_eq!(&rows[0][2], "decreasing");
        assert_eq!(&rows[0][10], "significant");
    }

    #[test]
    fn contamination_csv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");
        let events = [ContaminationEvent {
            date: NaiveDate::from_ymd_opt(2018, 8, 12).unwrap(),
            kind: ContaminationKind::LowVisNirRatio,
            value: 1.2,
            threshold: 1.6,
            severity: Severity::High,
        }];
        write_contamination_csv(&path, &events).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().nth(1).unwrap(),
            "2018-08-12,low_vis_nir_ratio,1.200000,1.600000,high"
        );
    }

    #[test]
    fn unwritable_path_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x.csv");
        assert_eq!(write_annual_csv(&path, &[]).unwrap_err().exit_code(), 2);
    }
}
