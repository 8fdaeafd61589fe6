//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for the log filter:
//! 1. `--log-level` CLI flag
//! 2. `SITEWRIGHT_LOG` environment variable, any `EnvFilter` directive
//!    (`debug`, `sitewright::server=trace`, ...)
//! 3. `info`
//!
//! Logs go to stderr so build reports on stdout stay clean.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted when no `--log-level` is given.
pub const LOG_ENV: &str = "SITEWRIGHT_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Resolve the filter from the CLI level, the environment, or the default.
pub fn resolve_filter(cli_level: Option<LogLevel>) -> EnvFilter {
    match cli_level {
        Some(level) => EnvFilter::new(level.as_directive()),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) {
    tracing_subscriber::fmt()
        .with_env_filter(resolve_filter(cli_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
