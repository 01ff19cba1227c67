//! Command-line interface for genobench.
//!
//! Provides commands for listing suites and running the benchmark against a
//! scripted agent transport.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli};
