//! Logging setup for xharvest.
//!
//! Both batch jobs report progress as `tracing` events with structured
//! fields (query, attempt, page size, totals). Events go to stderr so the
//! colored summaries on stdout stay clean.
//!
//! `RUST_LOG` replaces the computed filter when set.
//!
//! ```rust
//! use xharvest::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::default());
//! tracing::info!(query = "Palmeiras", "Starting query");
//! ```

use std::time::Instant;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Prefix each event with a timestamp (compact format only).
    pub timestamps: bool,
    /// Enable ANSI colors.
    pub colors: bool,
}

/// Minimum level for xharvest's own events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

/// Event layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One line per event.
    Compact,
    /// Multi-line with source locations, for `--verbose`.
    Pretty,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            timestamps: true,
            colors: true,
        }
    }
}

impl LogConfig {
    /// Config for the global `--quiet` / `--verbose` flags. Quiet wins.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self {
                level: LogLevel::Error,
                timestamps: false,
                ..Self::default()
            }
        } else if verbose {
            Self {
                level: LogLevel::Debug,
                format: LogFormat::Pretty,
                ..Self::default()
            }
        } else {
            Self::default()
        }
    }

    /// Filter directives: our level for this crate, warnings only from the
    /// HTTP stack underneath the provider and classifier clients.
    #[must_use]
    pub fn directives(&self) -> String {
        let level = match self.level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        let deps = if self.level == LogLevel::Error { "error" } else { "warn" };
        format!("xharvest={level},reqwest={deps},hyper={deps},rustls={deps}")
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(config: &LogConfig) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(config.directives())
    };
    let registry = tracing_subscriber::registry().with(filter);

    let result = match (config.format, config.timestamps) {
        (LogFormat::Pretty, _) => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_ansi(config.colors),
            )
            .try_init(),
        (LogFormat::Compact, true) => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(config.colors),
            )
            .try_init(),
        (LogFormat::Compact, false) => registry
            .with(
                fmt::layer()
                    .compact()
                    .without_time()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(config.colors),
            )
            .try_init(),
    };
    // Already installed (tests, repeated calls)
    result.ok();
}

/// Initialize logging from the CLI flags.
pub fn init_cli_logging(quiet: bool, verbose: bool, colors: bool) {
    let config = LogConfig {
        colors,
        ..LogConfig::from_flags(quiet, verbose)
    };
    init_logging(&config);
}

/// Logs the start, duration and outcome of one batch job.
pub struct OperationGuard {
    job: &'static str,
    start: Instant,
}

impl OperationGuard {
    pub fn new(job: &'static str) -> Self {
        tracing::info!(job, "Job started");
        Self {
            job,
            start: Instant::now(),
        }
    }

    /// Job finished; `records` is the number of rows it wrote.
    pub fn complete(self, records: u64) {
        let elapsed = self.start.elapsed();
        tracing::info!(
            job = self.job,
            records,
            duration_ms = elapsed.as_millis(),
            "Job completed"
        );
    }

    /// Job stopped on an error.
    pub fn fail(self, error: &dyn std::error::Error) {
        let elapsed = self.start.elapsed();
        tracing::error!(
            job = self.job,
            duration_ms = elapsed.as_millis(),
            error = %error,
            "Job failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_beats_verbose() {
        let config = LogConfig::from_flags(true, true);
        assert_eq!(config.level, LogLevel::Error);
        assert!(!config.timestamps);
    }

    #[test]
    fn verbose_uses_pretty_debug() {
        let config = LogConfig::from_flags(false, true);
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn directives_quiet_http_stack() {
        assert_eq!(
            LogConfig::default().directives(),
            "xharvest=info,reqwest=warn,hyper=warn,rustls=warn"
        );
        assert_eq!(
            LogConfig::from_flags(true, false).directives(),
            "xharvest=error,reqwest=error,hyper=error,rustls=error"
        );
    }

    #[test]
    fn init_twice_is_harmless() {
        let config = LogConfig {
            colors: false,
            ..LogConfig::default()
        };
        init_logging(&config);
        init_logging(&config);
    }
}
