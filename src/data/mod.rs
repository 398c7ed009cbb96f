//! Data sources other than user-supplied CSVs.

pub mod synthetic;
