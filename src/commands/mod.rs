//! Command implementations
//!
//! Each module corresponds to a CLI entry point.

pub mod import;

pub use import::{run as import_run, run_with as import_run_with, RunOptions, RunSummary};
