//! Reporting: terminal summaries and the optional text report file.

pub mod format;
pub mod text;

pub use format::*;
pub use text::*;
