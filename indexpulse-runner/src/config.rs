//! Serializable run configuration.
//!
//! Every field has a default, so an empty TOML file is a valid config that
//! reproduces the stock behaviour: ten major indices from the quote API,
//! top three written to `top3_indices.csv`.

use indexpulse_core::fetch::{HttpSettings, RetryPolicy, SourceKind};
use indexpulse_core::fetch::{html_table, scanner, yahoo};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_OUTPUT: &str = "top3_indices.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// What to do with an existing output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Replace the file atomically.
    #[default]
    Overwrite,
    /// Add rows to the end; the header is written only for a new or empty file.
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: "Mozilla/5.0".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub yahoo: String,
    pub scanner: String,
    pub html: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            yahoo: yahoo::DEFAULT_ENDPOINT.into(),
            scanner: scanner::DEFAULT_ENDPOINT.into(),
            html: html_table::DEFAULT_ENDPOINT.into(),
        }
    }
}

/// Configuration for one fetch-rank-export run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Which upstream to query.
    pub source: SourceKind,

    /// Symbols to request. `None` uses the source's defaults; an empty list
    /// asks for a whole-market scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<String>>,

    /// CSV output path.
    pub output: PathBuf,

    pub write_policy: WritePolicy,
    pub http: HttpConfig,
    pub retry: RetryConfig,
    pub endpoints: EndpointConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            symbols: None,
            output: PathBuf::from(DEFAULT_OUTPUT),
            write_policy: WritePolicy::default(),
            http: HttpConfig::default(),
            retry: RetryConfig::default(),
            endpoints: EndpointConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.timeout_secs must be positive".into()));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output path is empty".into()));
        }
        if self.endpoint().trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "no endpoint configured for source '{}'",
                self.source
            )));
        }
        Ok(())
    }

    /// Symbols to send to the configured source.
    pub fn symbols_for_source(&self) -> Vec<String> {
        match &self.symbols {
            Some(list) => list.clone(),
            None => self.source.default_symbols(),
        }
    }

    /// Endpoint URL for the configured source.
    pub fn endpoint(&self) -> &str {
        match self.source {
            SourceKind::YahooQuote => &self.endpoints.yahoo,
            SourceKind::Scanner => &self.endpoints.scanner,
            SourceKind::HtmlTable => &self.endpoints.html,
        }
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.http.timeout_secs),
            user_agent: self.http.user_agent.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }
}
