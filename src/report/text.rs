//! Plain-text report file.
//!
//! Same content as the terminal output, framed by a header naming the run and
//! a footer with the generation time.

use std::fs;
use std::path::Path;

use chrono::Utc;

use crate::error::AppError;

const RULE: &str = "======================================================================";

/// Frame `sections` into a report document.
pub fn render_text_report(title: &str, input: &Path, sections: &[String]) -> String {
    let mut out = String::new();
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("ATHABASCA GLACIER ALBEDO: {}\n", title.to_uppercase()));
    out.push_str(&format!("Input: {}\n", input.display()));
    out.push_str(RULE);
    out.push_str("\n\n");

    for section in sections {
        out.push_str(section.trim_end());
        out.push_str("\n\n");
    }

    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!(
        "Generated by albedo {} at {}\n",
        env!("CARGO_PKG_VERSION"),
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out
}

pub fn write_text_report(path: &Path, title: &str, input: &Path, sections: &[String]) -> Result<(), AppError> {
    fs::write(path, render_text_report(title, input, sections))
        .map_err(|e| AppError::input(format!("Failed to write report '{}': {e}", path.display())))
}
