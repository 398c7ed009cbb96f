//! CSV ingest and normalization.
//!
//! Turns an extracted MODIS CSV into clean observations:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Quality filters** (minimum pixel count, month window) applied here so
//!   the analyses only ever see usable rows

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use csv::StringRecord;

use crate::domain::{Observation, SpectralRecord};
use crate::error::AppError;

/// Default per-date albedo column.
pub const DEFAULT_VALUE_COLUMN: &str = "albedo_mean";

/// Default minimum glacier pixels behind a per-date mean.
pub const DEFAULT_MIN_PIXELS: u32 = 5;

/// How to read and filter an observation CSV.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub value_column: String,
    /// Rows whose `pixel_count` is below this are dropped (when the column exists).
    pub min_pixels: u32,
    /// Make the `elevation` column mandatory.
    pub require_elevation: bool,
    /// Keep only these months (empty keeps everything).
    pub months: Vec<u32>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            value_column: DEFAULT_VALUE_COLUMN.to_string(),
            min_pixels: DEFAULT_MIN_PIXELS,
            require_elevation: false,
            months: Vec::new(),
        }
    }
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct IngestedObservations {
    pub observations: Vec<Observation>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    /// Rows that parsed but were dropped by the pixel/month filters.
    pub rows_filtered: usize,
}

#[derive(Debug, Clone)]
pub struct IngestedSpectral {
    pub records: Vec<SpectralRecord>,
    pub band_names: Vec<String>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

fn open_reader(path: &Path) -> Result<(csv::Reader<File>, StringRecord), AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers: {e}")))?
        .clone();
    Ok((reader, headers))
}

/// Load per-date observations, applying the quality filters.
pub fn load_observations(path: &Path, options: &IngestOptions) -> Result<IngestedObservations, AppError> {
    let (mut reader, headers) = open_reader(path)?;
    let header_map = build_header_map(&headers);

    let value_column = normalize_header_name(&options.value_column);
    if !header_map.contains_key("date") {
        return Err(AppError::input("Missing required column: `date`"));
    }
    if !header_map.contains_key(&value_column) {
        return Err(AppError::input(format!(
            "Missing value column: `{}`",
            options.value_column
        )));
    }
    if options.require_elevation && !header_map.contains_key("elevation") {
        return Err(AppError::input(
            "Elevation-band analysis requires an `elevation` column in the CSV.",
        ));
    }

    let mut observations = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_filtered = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line; CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_observation(&record, &header_map, &value_column, options) {
            Ok(obs) if keep_observation(&obs, options) => observations.push(obs),
            Ok(_) => rows_filtered += 1,
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if observations.is_empty() {
        return Err(AppError::insufficient(
            "No valid observations remain after parsing/filtering.",
        ));
    }
    observations.sort_by_key(|o| o.date);

    Ok(IngestedObservations {
        observations,
        row_errors,
        rows_read,
        rows_filtered,
    })
}

fn keep_observation(obs: &Observation, options: &IngestOptions) -> bool {
    if let Some(pixels) = obs.pixel_count {
        if pixels < options.min_pixels {
            return false;
        }
    }
    options.months.is_empty() || options.months.contains(&obs.month)
}

fn parse_observation(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    value_column: &str,
    options: &IngestOptions,
) -> Result<Observation, String> {
    let date = parse_date(get_required(record, header_map, "date")?)?;
    let value = parse_f64(get_required(record, header_map, value_column)?, value_column)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("`{value_column}` {value} is outside [0, 1]."));
    }

    let pixel_count = match get_optional(record, header_map, "pixel_count") {
        Some(s) => Some(
            s.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v as u32)
                .ok_or_else(|| format!("Invalid `pixel_count` '{s}'."))?,
        ),
        None => None,
    };

    let elevation = match get_optional(record, header_map, "elevation") {
        Some(s) => Some(parse_f64(s, "elevation")?),
        None if options.require_elevation => {
            return Err("Missing required value: `elevation`".to_string());
        }
        None => None,
    };

    Ok(Observation {
        date,
        year: date.year(),
        month: date.month(),
        value,
        pixel_count,
        elevation,
    })
}

/// Load MCD43A3 spectral records: `date` plus any `Albedo_BSA_*`/`Albedo_WSA_*` columns.
///
/// Empty or non-numeric band cells are left out of that record's band map.
pub fn load_spectral_records(path: &Path) -> Result<IngestedSpectral, AppError> {
    let (mut reader, headers) = open_reader(path)?;
    let header_map = build_header_map(&headers);
    if !header_map.contains_key("date") {
        return Err(AppError::input("Missing required column: `date`"));
    }

    let band_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| canonical_band_name(name).map(|band| (idx, band)))
        .collect();
    if band_columns.is_empty() {
        return Err(AppError::input(
            "No spectral albedo columns (`Albedo_BSA_*` / `Albedo_WSA_*`) found in the CSV.",
        ));
    }

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let date = match get_required(&record, &header_map, "date").and_then(parse_date) {
            Ok(d) => d,
            Err(message) => {
                row_errors.push(RowError { line, message });
                continue;
            }
        };

        let bands = band_columns
            .iter()
            .filter_map(|(col, band)| {
                let v = record.get(*col)?.trim().parse::<f64>().ok()?;
                v.is_finite().then(|| (band.clone(), v))
            })
            .collect();

        records.push(SpectralRecord {
            date,
            year: date.year(),
            month: date.month(),
            bands,
        });
    }

    if records.is_empty() {
        return Err(AppError::insufficient("No valid spectral records in the CSV."));
    }
    records.sort_by_key(|r| r.date);

    Ok(IngestedSpectral {
        records,
        band_names: band_columns.into_iter().map(|(_, b)| b).collect(),
        row_errors,
        rows_read,
    })
}

/// `albedo_bsa_band1` -> `Albedo_BSA_Band1`, `ALBEDO_WSA_VIS` -> `Albedo_WSA_vis`.
fn canonical_band_name(name: &str) -> Option<String> {
    let lower = normalize_header_name(name);
    let (kind, suffix) = if let Some(rest) = lower.strip_prefix("albedo_bsa_") {
        ("BSA", rest)
    } else if let Some(rest) = lower.strip_prefix("albedo_wsa_") {
        ("WSA", rest)
    } else {
        return None;
    };
    let suffix = match suffix.strip_prefix("band") {
        Some(n) if !n.is_empty() => format!("Band{n}"),
        _ => suffix.to_string(),
    };
    Some(format!("Albedo_{kind}_{suffix}"))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel likes to prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // Earth Engine exports use ISO dates; some tools add a time component.
    const FMTS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
    let day = s.split(['T', ' ']).next().unwrap_or(s);
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(day, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected YYYY-MM-DD or YYYY/MM/DD."
    ))
}

fn parse_f64(s: &str, name: &str) -> Result<f64, String> {
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("Invalid `{name}` value '{s}'."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parse_date_accepts_common_formats() {
        let expected = NaiveDate::from_ymd_opt(2019, 7, 14).unwrap();
        assert_eq!(parse_date("2019-07-14").unwrap(), expected);
        assert_eq!(parse_date("2019/07/14").unwrap(), expected);
        assert_eq!(parse_date("2019-07-14T00:00:00").unwrap(), expected);
        assert!(parse_date("14.07.2019").is_err());
    }

    #[test]
    fn loads_and_filters_observations() {
        let csv = write_csv(
            "\u{feff}Date,Albedo_Mean,pixel_count\n\
             2020-07-02,0.55,12\n\
             2020-07-01,0.60,8\n\
             2020-07-03,0.50,2\n\
             2020-05-01,0.80,20\n\
             not-a-date,0.5,10\n\
             2020-07-04,1.7,10\n",
        );
        let options = IngestOptions {
            months: vec![6, 7, 8, 9],
            ..IngestOptions::default()
        };
        let data = load_observations(csv.path(), &options).unwrap();
        assert_eq!(data.rows_read, 6);
        assert_eq!(data.observations.len(), 2);
        assert_eq!(data.rows_filtered, 2);
        assert_eq!(data.row_errors.len(), 2);
        assert_eq!(data.row_errors[0].line, 6);

        // sorted by date
        assert_eq!(data.observations[0].value, 0.60);
        assert_eq!(data.observations[0].month, 7);
        assert_eq!(data.observations[0].pixel_count, Some(8));
    }

    #[test]
    fn missing_columns_are_input_errors() {
        let csv = write_csv("date,other\n2020-07-01,0.5\n");
        let err = load_observations(csv.path(), &IngestOptions::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let csv = write_csv("date,albedo_mean\n2020-07-01,0.5\n");
        let options = IngestOptions {
            require_elevation: true,
            ..IngestOptions::default()
        };
        let err = load_observations(csv.path(), &options).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn all_rows_filtered_is_insufficient_data() {
        let csv = write_csv("date,albedo_mean,pixel_count\n2020-07-01,0.5,1\n");
        let err = load_observations(csv.path(), &IngestOptions::default()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn loads_spectral_records_with_canonical_band_names() {
        let csv = write_csv(
            "date,albedo_bsa_band1,Albedo_BSA_vis,ALBEDO_BSA_NIR,qa\n\
             2021-08-01,0.71,0.80,,1\n\
             2021-07-01,0.75,0.85,0.45,1\n",
        );
        let data = load_spectral_records(csv.path()).unwrap();
        assert_eq!(
            data.band_names,
            vec!["Albedo_BSA_Band1", "Albedo_BSA_vis", "Albedo_BSA_nir"]
        );
        assert_eq!(data.records.len(), 2);
        assert_eq!(data.records[0].month, 7);
        assert_eq!(data.records[0].band("Albedo_BSA_nir"), Some(0.45));
        assert_eq!(data.records[1].band("Albedo_BSA_nir"), None);
        assert!(data.records[1].band("qa").is_none());
    }

    #[test]
    fn spectral_needs_band_columns() {
        let csv = write_csv("date,value\n2021-08-01,0.5\n");
        assert_eq!(load_spectral_records(csv.path()).unwrap_err().exit_code(), 2);
    }
}
