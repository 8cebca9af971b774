//! Tracing configuration for the launcher CLI
//!
//! Logs go to stderr so the wrapped CLI owns stdout. The output format comes
//! from `A11Y_LAUNCHER_LOG_FORMAT`, the filter from `RUST_LOG` or the
//! `--log-level` option.

use std::io;
pub use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "A11Y_LAUNCHER_LOG_FORMAT";

/// Tracing output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingFormat {
    /// Pretty-printed human-readable format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
    /// Structured JSON format
    Json,
}

/// Log level options for CLI
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogLevel {
    /// Show all logs (trace level)
    Trace,
    /// Show debug and above
    Debug,
    /// Show info and above (default)
    Info,
    /// Show warnings and above
    Warn,
    /// Show errors only
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

impl std::str::FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown tracing format: {s}")),
        }
    }
}

impl TracingFormat {
    /// Read the format from [`LOG_FORMAT_ENV`], falling back to compact.
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }
}

/// Tracing configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub format: TracingFormat,
    pub level: Level,
}

/// Global correlation ID for this invocation
static CORRELATION_ID: std::sync::OnceLock<Uuid> = std::sync::OnceLock::new();

/// Get or create the correlation ID for the current invocation
pub fn correlation_id() -> Uuid {
    *CORRELATION_ID.get_or_init(Uuid::new_v4)
}

fn level_str(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Directive used when `RUST_LOG` is not set.
fn default_directive(level: Level) -> String {
    let level = level_str(level);
    format!("a11y_launcher={level},a11y_launcher_core={level}")
}

/// `RUST_LOG` wins when it parses; otherwise both crates log at `level`.
fn env_filter(rust_log: Option<String>, level: Level) -> miette::Result<EnvFilter> {
    match rust_log.map(EnvFilter::try_new) {
        Some(Ok(filter)) => Ok(filter),
        _ => EnvFilter::try_new(default_directive(level))
            .map_err(|e| miette::miette!("Failed to create tracing filter: {e}")),
    }
}

/// Initialize tracing with the given configuration
pub fn init_tracing(config: TracingConfig) -> miette::Result<()> {
    let correlation_id = correlation_id();

    let env_filter = env_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok(), config.level)?;

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        TracingFormat::Pretty => {
            let layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(io::stderr)
                .with_target(true);

            registry.with(layer).init();
        }
        TracingFormat::Compact => {
            let layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(io::stderr)
                .with_target(false)
                .without_time();

            registry.with(layer).init();
        }
        TracingFormat::Json => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_current_span(true)
                .with_span_list(true);

            registry.with(layer).init();
        }
    }

    tracing::debug!(
        correlation_id = %correlation_id,
        version = env!("CARGO_PKG_VERSION"),
        format = ?config.format,
        "Tracing initialized for a11y-launcher"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("pretty".parse::<TracingFormat>().unwrap(), TracingFormat::Pretty);
        assert_eq!(" JSON ".parse::<TracingFormat>().unwrap(), TracingFormat::Json);
        assert!("dev".parse::<TracingFormat>().is_err());
    }

    #[test]
    fn test_default_directive_covers_both_crates() {
        assert_eq!(
            default_directive(Level::WARN),
            "a11y_launcher=warn,a11y_launcher_core=warn"
        );
    }

    #[test]
    fn test_level_applies_without_rust_log() {
        let filter = env_filter(None, Level::DEBUG).unwrap();
        assert_eq!(
            filter.max_level_hint(),
            Some(tracing::level_filters::LevelFilter::DEBUG)
        );
    }

    #[test]
    fn test_rust_log_overrides_level() {
        let filter = env_filter(Some("trace".to_string()), Level::WARN).unwrap();
        assert_eq!(
            filter.max_level_hint(),
            Some(tracing::level_filters::LevelFilter::TRACE)
        );

        let fallback = env_filter(Some("a11y_launcher=nonsense".to_string()), Level::WARN).unwrap();
        assert_eq!(
            fallback.max_level_hint(),
            Some(tracing::level_filters::LevelFilter::WARN)
        );
    }

    #[test]
    fn test_correlation_id_consistency() {
        assert_eq!(correlation_id(), correlation_id());
    }
}
