//! Command-line interface for scene-forge.
//!
//! Provides commands for motion analysis, split inspection, version
//! extraction, training-index filtering and dataset checks.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
