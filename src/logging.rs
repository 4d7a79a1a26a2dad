//! Diagnostics for `ccsh` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` flag (if provided)
//! 2. `CCSH_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `warn`
//!
//! Events go to stderr: stdout belongs to the pipelines.

use anyhow::{Result, anyhow};
use tracing::Level;

/// Environment variable consulted when no level is given on the command line.
pub const LOG_ENV: &str = "CCSH_LOG";

/// Install the global subscriber. Call once, before the first line is read.
pub fn init_logging(cli_level: Option<&str>) -> Result<()> {
    let level = match cli_level {
        Some(s) => parse_level_str(s).ok_or_else(|| anyhow!("unknown log level: {}", s))?,
        None => std::env::var(LOG_ENV)
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(Level::WARN),
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("cannot install log subscriber: {}", e))?;

    Ok(())
}

pub fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
