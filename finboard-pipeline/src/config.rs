//! TOML configuration for the dashboard.
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration:
//!
//! ```toml
//! symbols_file = "symbols.toml"
//!
//! [timeouts]
//! price_secs = 15
//! sentiment_secs = 10
//! agent_secs = 60
//!
//! [allocator]
//! samples = 10000
//! seed = 42
//!
//! [macro]
//! data_dir = "statcan"
//! start = "2014-01-01"
//! ```

use chrono::NaiveDate;
use finboard_core::allocator::{AllocatorConfig, DEFAULT_SAMPLES, TRADING_DAYS};
use finboard_core::data::YahooOptions;
use finboard_core::domain::ReferenceTable;
use finboard_core::sentiment::DEFAULT_MAX_SNIPPETS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("symbol table: {0}")]
    Symbols(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Optional `[[symbols]]` TOML file replacing the built-in table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols_file: Option<PathBuf>,
    pub timeouts: TimeoutConfig,
    pub provider: ProviderConfig,
    pub allocator: AllocatorSettings,
    #[serde(rename = "macro")]
    pub macro_data: MacroConfig,
    pub agent: AgentConfig,
    pub sentiment: SentimentConfig,
}

/// Upper bounds on every external call, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub price_secs: u64,
    pub sentiment_secs: u64,
    pub agent_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            price_secs: 15,
            sentiment_secs: 10,
            agent_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub breaker_cooldown_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            breaker_cooldown_secs: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorSettings {
    pub samples: usize,
    pub trading_days: f64,
    /// Master seed; requests may override it.
    pub seed: u64,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            trading_days: TRADING_DAYS,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroConfig {
    /// Directory holding Statistics Canada full-table CSV downloads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub start: NaiveDate,
}

impl Default for MacroConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            start: NaiveDate::from_ymd_opt(2014, 1, 1).unwrap_or(NaiveDate::MIN),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub max_snippets: usize,
    /// Local `{company}.txt` snippet files; takes precedence over `endpoint`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippets_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            max_snippets: DEFAULT_MAX_SNIPPETS,
            snippets_dir: None,
            endpoint: None,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timeouts;
        if t.price_secs == 0 || t.sentiment_secs == 0 || t.agent_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be at least 1 second".into()));
        }
        if self.allocator.samples == 0 {
            return Err(ConfigError::Invalid("allocator.samples must be positive".into()));
        }
        if !(self.allocator.trading_days.is_finite() && self.allocator.trading_days > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "allocator.trading_days must be positive, got {}",
                self.allocator.trading_days
            )));
        }
        if self.sentiment.max_snippets == 0 {
            return Err(ConfigError::Invalid("sentiment.max_snippets must be positive".into()));
        }
        Ok(())
    }

    pub fn yahoo_options(&self) -> YahooOptions {
        YahooOptions {
            timeout: Duration::from_secs(self.timeouts.price_secs),
            max_retries: self.provider.max_retries,
            base_delay: Duration::from_millis(self.provider.base_delay_ms),
        }
    }

    pub fn allocator_config(&self) -> AllocatorConfig {
        AllocatorConfig {
            samples: self.allocator.samples,
            trading_days: self.allocator.trading_days,
        }
    }

    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.provider.breaker_cooldown_secs)
    }

    pub fn sentiment_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.sentiment_secs)
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.agent_secs)
    }

    /// The configured symbol table, or the built-in Canadian one.
    pub fn reference_table(&self) -> Result<ReferenceTable, ConfigError> {
        match &self.symbols_file {
            Some(path) => ReferenceTable::from_file(path).map_err(ConfigError::Symbols),
            None => Ok(ReferenceTable::default_canada()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let c = Config::from_toml("").unwrap();
        assert_eq!(c, Config::default());
        assert_eq!(c.timeouts.price_secs, 15);
        assert_eq!(c.allocator.samples, 10_000);
        assert_eq!(c.macro_data.start, NaiveDate::from_ymd_opt(2014, 1, 1).unwrap());
        assert_eq!(c.sentiment.max_snippets, 30);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let c = Config::from_toml(
            r#"
            [timeouts]
            agent_secs = 5

            [macro]
            data_dir = "/data/statcan"
            start = "2018-01-01"

            [agent]
            endpoint = "http://localhost:8080/agent"
            "#,
        )
        .unwrap();
        assert_eq!(c.timeouts.agent_secs, 5);
        assert_eq!(c.timeouts.price_secs, 15);
        assert_eq!(c.macro_data.data_dir, Some(PathBuf::from("/data/statcan")));
        assert_eq!(c.macro_data.start, NaiveDate::from_ymd_opt(2018, 1, 1).unwrap());
        assert_eq!(c.agent.endpoint.as_deref(), Some("http://localhost:8080/agent"));
        assert_eq!(c.agent_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn rejects_zero_samples() {
        let err = Config::from_toml("[allocator]\nsamples = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_timeout() {
        assert!(Config::from_toml("[timeouts]\nprice_secs = 0\n").is_err());
    }

    #[test]
    fn unknown_type_is_parse_error() {
        let err = Config::from_toml("[allocator]\nseed = \"abc\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn toml_output_reloads() {
        let mut c = Config::default();
        c.sentiment.snippets_dir = Some(PathBuf::from("snippets"));
        let text = c.to_toml().unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), c);
    }

    #[test]
    fn derived_options() {
        let c = Config::default();
        let y = c.yahoo_options();
        assert_eq!(y.timeout, Duration::from_secs(15));
        assert_eq!(y.base_delay, Duration::from_millis(500));
        assert_eq!(c.allocator_config().samples, 10_000);
        assert!(!c.reference_table().unwrap().is_empty());
    }

    #[test]
    fn from_file_reads_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[allocator]\nseed = 7\n").unwrap();
        assert_eq!(Config::from_file(&path).unwrap().allocator.seed, 7);

        let err = Config::from_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
