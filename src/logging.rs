// src/logging.rs

//! Logging setup for `taskdag` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `TASKDAG_LOG` environment variable: either a bare level ("debug") or
//!    full filter directives ("taskdag::engine=debug,info")
//! 3. default to `info`
//!
//! Logs go to STDERR so that stdout carries only the run summary and the
//! `--dry-run` / `--dot` output.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable consulted when no `--log-level` is given.
pub const LOG_ENV_VAR: &str = "TASKDAG_LOG";

/// Initialise global logging subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(lvl) => EnvFilter::new(level_directive(lvl)),
        None => env_filter(std::env::var(LOG_ENV_VAR).ok().as_deref()),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("installing tracing subscriber: {err}"))
}

fn level_directive(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

/// Filter from the raw env value; unset, blank or malformed falls back to
/// `info`.
fn env_filter(raw: Option<&str>) -> EnvFilter {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => {
            EnvFilter::try_new(value.to_lowercase()).unwrap_or_else(|_| EnvFilter::new("info"))
        }
        _ => EnvFilter::new("info"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_levels_map_to_directives() {
        assert_eq!(level_directive(LogLevel::Trace), "trace");
        assert_eq!(level_directive(LogLevel::Warn), "warn");
    }

    #[test]
    fn env_value_accepts_levels_and_directives() {
        assert!(env_filter(Some(" DEBUG ")).to_string().contains("debug"));
        assert!(env_filter(Some("taskdag::engine=debug"))
            .to_string()
            .contains("taskdag::engine=debug"));
        assert!(env_filter(None).to_string().contains("info"));
        assert!(env_filter(Some("")).to_string().contains("info"));
    }
}
