//! Configuration loading
//!
//! The config file is TOML. Every section and field is optional and falls back
//! to the defaults below; unknown fields are rejected. Values are validated
//! once at load time, so the rest of the program can trust them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::CacheSettings;
use crate::ranking::RankingConfig;
use crate::retry::RetryPolicy;
use crate::sources::HnEndpoint;

/// Upper bound for `retry.max_attempts`
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Upper bound for `analysis.top_n` and per-source limits
pub const MAX_ITEMS: usize = 100;

/// Upper bound for `sources.github.window_days`
pub const MAX_WINDOW_DAYS: u32 = 365;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// The `[caching]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CachingConfig {
    pub enabled: bool,
    /// Entry lifetime in hours; fractions are allowed
    pub ttl_hours: f64,
}

impl Default for CachingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_hours: 1.0,
        }
    }
}

/// The `[analysis]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Number of items kept in the final digest
    pub top_n: usize,
    /// Topics the relevance scorer looks for
    pub topics: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_n: 25,
            topics: Vec::new(),
        }
    }
}

/// The `[sources.github]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubSourceConfig {
    pub enabled: bool,
    /// Repositories created within this many days count as trending
    pub window_days: u32,
    pub limit: usize,
}

impl Default for GitHubSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_days: 7,
            limit: 30,
        }
    }
}

/// The `[sources.hackernews]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HackerNewsSourceConfig {
    pub enabled: bool,
    pub endpoints: Vec<HnEndpoint>,
    /// Stories fetched per endpoint
    pub limit: usize,
}

impl Default for HackerNewsSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoints: vec![HnEndpoint::Top],
            limit: 30,
        }
    }
}

/// The `[sources]` section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesConfig {
    pub github: GitHubSourceConfig,
    pub hackernews: HackerNewsSourceConfig,
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub caching: CachingConfig,
    pub retry: RetryPolicy,
    pub ranking: RankingConfig,
    pub analysis: AnalysisConfig,
    pub sources: SourcesConfig,
}

impl Config {
    /// Reads, parses and validates the config file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parses and validates TOML text
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.caching.ttl_hours.is_finite() || self.caching.ttl_hours < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "caching.ttl_hours",
                reason: format!("must be a non-negative number, got {}", self.caching.ttl_hours),
            });
        }

        if !(1..=MAX_RETRY_ATTEMPTS).contains(&self.retry.max_attempts) {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts",
                reason: format!(
                    "must be between 1 and {}, got {}",
                    MAX_RETRY_ATTEMPTS, self.retry.max_attempts
                ),
            });
        }

        if self.retry.backoff_multiplier < 1 {
            return Err(ConfigError::InvalidValue {
                field: "retry.backoff_multiplier",
                reason: "must be at least 1".to_string(),
            });
        }

        self.ranking.weights.validate()?;

        if !(1..=MAX_ITEMS).contains(&self.analysis.top_n) {
            return Err(ConfigError::InvalidValue {
                field: "analysis.top_n",
                reason: format!("must be between 1 and {}, got {}", MAX_ITEMS, self.analysis.top_n),
            });
        }

        let github = &self.sources.github;
        if !(1..=MAX_ITEMS).contains(&github.limit) {
            return Err(ConfigError::InvalidValue {
                field: "sources.github.limit",
                reason: format!("must be between 1 and {}, got {}", MAX_ITEMS, github.limit),
            });
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&github.window_days) {
            return Err(ConfigError::InvalidValue {
                field: "sources.github.window_days",
                reason: format!(
                    "must be between 1 and {}, got {}",
                    MAX_WINDOW_DAYS, github.window_days
                ),
            });
        }

        let hackernews = &self.sources.hackernews;
        if !(1..=MAX_ITEMS).contains(&hackernews.limit) {
            return Err(ConfigError::InvalidValue {
                field: "sources.hackernews.limit",
                reason: format!("must be between 1 and {}, got {}", MAX_ITEMS, hackernews.limit),
            });
        }
        if hackernews.enabled && hackernews.endpoints.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sources.hackernews.endpoints",
                reason: "must list at least one endpoint when the source is enabled".to_string(),
            });
        }

        Ok(())
    }

    /// Store settings derived from the `[caching]` section
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings::from_hours(self.caching.enabled, self.caching.ttl_hours)
    }
}
