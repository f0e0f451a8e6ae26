// src/cli.rs

//! CLI argument parsing using `clap`.

use std::str::FromStr;

use clap::{Parser, ValueEnum};

use crate::types::FailurePolicy;

/// Command-line arguments for `taskdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskdag",
    version,
    about = "Run a dependency graph of shell commands, each as soon as its dependencies succeed.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline file (TOML).
    ///
    /// Default: `Taskdag.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Taskdag.toml")]
    pub config: String,

    /// Override `[executor].max_concurrency`.
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Run nodes one at a time on the calling thread (debug mode).
    #[arg(long)]
    pub sequential: bool,

    /// Override `[executor].failure_policy` (continue or abort).
    #[arg(long, value_name = "POLICY", value_parser = FailurePolicy::from_str)]
    pub failure_policy: Option<FailurePolicy>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the graph, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the dependency graph in Graphviz DOT format and exit.
    #[arg(long)]
    pub dot: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
