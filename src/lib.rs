//! `athabasca-albedo` library crate.
//!
//! The binary (`albedo`) is a thin wrapper around this library so that:
//!
//! - the statistics and analyses are testable without spawning processes
//! - ingest, export and reporting can be reused from other tools
//! - code stays easy to navigate as the project grows

pub mod analysis;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod stats;
