//! Configuration management for rustle.
//!
//! This module provides:
//! - YAML file support
//! - Builder-style programmatic construction
//! - Validation of every series definition before any handle is created

use crate::core::types::{AggregationKind, SeriesKey};
use crate::core::{Result, RustleError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Complete configuration for rustle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store configuration
    pub store: StoreConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Series definitions
    pub series: Vec<SeriesConfig>,
    /// Debug mode
    #[serde(skip)]
    pub debug: bool,
}

/// Store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Snapshot file loaded before and saved after mutating commands
    pub data_file: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Include targets, thread ids and line numbers
    pub structured: bool,
}

/// Construction-time options of one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesConfig {
    /// Top-level grouping
    pub domain: String,
    /// Kind of event within the domain
    pub category: String,
    /// Series name within the category
    pub name: String,
    /// Bucket width in seconds
    pub period: i64,
    /// Number of periods to keep
    pub retention: i64,
    /// Aggregation kind, only `sum` is known
    pub aggregation: String,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            structured: false,
        }
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl SeriesConfig {
    /// Options for a `sum` series.
    pub fn sum(key: &SeriesKey, period: i64, retention: i64) -> Self {
        SeriesConfig {
            domain: key.domain().to_string(),
            category: key.category().to_string(),
            name: key.name().to_string(),
            period,
            retention,
            aggregation: AggregationKind::Sum.as_str().to_string(),
        }
    }

    /// Validates the options, returning the parsed key and aggregation.
    pub fn validate(&self) -> Result<(SeriesKey, AggregationKind)> {
        let key = SeriesKey::new(&self.domain, &self.category, &self.name)?;
        if self.period <= 0 {
            return Err(RustleError::config(format!(
                "{key}: period must be greater than 0, got {}",
                self.period
            )));
        }
        if self.retention < 0 {
            return Err(RustleError::config(format!(
                "{key}: retention must not be negative, got {}",
                self.retention
            )));
        }
        if self.retention.checked_mul(self.period).is_none() {
            return Err(RustleError::config(format!(
                "{key}: retention * period overflows"
            )));
        }
        let kind = self.aggregation.parse::<AggregationKind>()?;
        Ok((key, kind))
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for series in &self.series {
            let (key, _) = series.validate()?;
            if !seen.insert(key.to_string()) {
                return Err(RustleError::config(format!("duplicate series {key}")));
            }
        }
        Ok(())
    }

    /// Finds the options of a series by key
    pub fn find_series(&self, key: &SeriesKey) -> Option<&SeriesConfig> {
        self.series.iter().find(|s| {
            s.domain == key.domain() && s.category == key.category() && s.name == key.name()
        })
    }
}

/// Configuration builder for programmatic construction
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| RustleError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Add a series definition
    pub fn series(mut self, series: SeriesConfig) -> Self {
        self.config.series.push(series);
        self
    }

    /// Set the snapshot file
    pub fn data_file(mut self, path: PathBuf) -> Self {
        self.config.store.data_file = Some(path);
        self
    }

    /// Set log level
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Set debug mode
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
