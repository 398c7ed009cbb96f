//! JSON dump of a whole analysis run.
//!
//! The file wraps the analysis result in a small envelope naming the tool, the
//! analysis and the input it was computed from.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Serialize)]
struct JsonReport<'a, T: Serialize> {
    tool: &'static str,
    version: &'static str,
    analysis: &'a str,
    input: String,
    result: &'a T,
}

/// Write `result` as pretty JSON.
pub fn write_analysis_json<T: Serialize>(
    path: &Path,
    analysis: &str,
    input: &Path,
    result: &T,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create JSON '{}': {e}", path.display())))?;

    let report = JsonReport {
        tool: "albedo",
        version: env!("CARGO_PKG_VERSION"),
        analysis,
        input: input.display().to_string(),
        result,
    };

    serde_json::to_writer_pretty(BufWriter::new(file), &report)
        .map_err(|e| AppError::input(format!("Failed to write JSON '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnnualMean, ElevationBand, Significance};
    use std::collections::BTreeMap;

    #[test]
    fn writes_envelope_and_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let annual = vec![AnnualMean { year: 2020, mean: 0.5, std: 0.02, count: 7 }];
        write_analysis_json(&path, "annual", Path::new("data.csv"), &annual).unwrap();

        let value: serde_json::Value =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(value["tool"], "albedo");
        assert_eq!(value["analysis"], "annual");
        assert_eq!(value["input"], "data.csv");
        assert_eq!(value["result"][0]["year"], 2020);
        assert_eq!(value["result"][0]["count"], 7);
    }

    #[test]
    fn band_keyed_maps_serialize_as_snake_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bands.json");
        let mut slopes = BTreeMap::new();
        slopes.insert(ElevationBand::NearMedian, -0.01);
        write_analysis_json(&path, "hypsometric", Path::new("x.csv"), &slopes).unwrap();

        let value: serde_json::Value =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(value["result"]["near_median"], -0.01);
    }

    #[test]
    fn significance_labels_match_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trend.json");
        let flat = crate::stats::trend_statistics(&[0.5, 0.52, 0.49, 0.51, 0.5], &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(flat.significance, Significance::NotSignificant);
        write_analysis_json(&path, "trend", Path::new("x.csv"), &flat).unwrap();

        let value: serde_json::Value =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(value["result"]["significance"], Significance::NotSignificant.as_str());
        assert_eq!(
            serde_json::to_value(Significance::Significant).unwrap(),
            Significance::Significant.as_str()
        );
    }
}
