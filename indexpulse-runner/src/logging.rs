//! Logging configuration and initialization.
//!
//! Log lines go to stderr so the summary printed on stdout stays clean.

use std::env;

use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const UTC_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output
    #[default]
    Pretty,
    /// Single-line output
    Compact,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    /// Parse a format name; anything unrecognised is `Pretty`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset
    pub default_level: String,
    pub include_target: bool,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            default_level: "info".to_string(),
            include_target: true,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    ///
    /// Reads:
    /// - `LOG_FORMAT`: pretty, compact, or json
    /// - `LOG_LEVEL`: default level (fallback if `RUST_LOG` is not set)
    /// - `NO_COLOR`: disables ANSI colours when set
    pub fn from_env() -> Self {
        Self {
            format: env::var("LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or_default(),
            default_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            include_target: true,
            ansi: env::var_os("NO_COLOR").is_none(),
        }
    }

    pub fn with_default_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }
}

/// Initialize the global subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_level));
    let registry = tracing_subscriber::registry().with(env_filter);
    let timer = ChronoUtc::new(UTC_TIMESTAMP.to_string());

    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_timer(timer)
                .with_target(config.include_target)
                .with_writer(std::io::stderr);
            registry.with(layer).try_init()?;
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_timer(timer)
                .with_target(config.include_target)
                .with_ansi(config.ansi)
                .with_writer(std::io::stderr);
            registry.with(layer).try_init()?;
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_timer(timer)
                .with_target(config.include_target)
                .with_ansi(config.ansi)
                .with_writer(std::io::stderr);
            registry.with(layer).try_init()?;
        }
    }

    Ok(())
}
