// src/logging.rs

//! Tracing setup.
//!
//! The effective filter is chosen in priority order:
//! 1. the `--log-level` CLI flag
//! 2. the `PIPEWATCH_LOG` environment variable (an `EnvFilter` directive
//!    string, e.g. `"debug"` or `"pipewatch=debug,notify=warn"`)
//! 3. `info`
//!
//! Logs go to stderr; stdout stays free for job output.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level_directive(level)),
        None => EnvFilter::try_from_env("PIPEWATCH_LOG")
            .unwrap_or_else(|_| EnvFilter::new("info")),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
