//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - result exports to CSV (`export`)
//! - whole-run JSON dump (`report_json`)

pub mod export;
pub mod ingest;
pub mod report_json;

pub use export::*;
pub use ingest::*;
pub use report_json::*;
