//! Serializable run configuration.
//!
//! One TOML file describes a complete run: where the bars come from, the
//! strategy parameters and the paper broker's state.

use amlab_core::AmlStrategyConfig;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid [strategy]: {0}")]
    Strategy(#[from] amlab_core::ConfigError),

    #[error("[data] needs exactly one of `csv` or `synthetic`")]
    DataSource,

    #[error("synthetic data needs bars > 0, a positive start price and interval")]
    Synthetic,
}

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub strategy: AmlStrategyConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub csv: Option<PathBuf>,
    #[serde(default)]
    pub synthetic: Option<SyntheticSpec>,
    #[serde(default = "default_symbol")]
    pub symbol: String,
}

fn default_symbol() -> String {
    "SYNTH".to_string()
}

/// Parameters of a seeded random walk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSpec {
    pub bars: usize,
    pub seed: u64,
    pub start_price: f64,
    pub interval_minutes: i64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            bars: 500,
            seed: 42,
            start_price: 100.0,
            interval_minutes: 60,
        }
    }
}

/// 2024-01-01T00:00:00Z, the first synthetic bar.
const SYNTHETIC_EPOCH: i64 = 1_704_067_200;

impl SyntheticSpec {
    /// Time of bar `index`, or `None` once the offset leaves chrono's range.
    pub fn bar_time(&self, index: usize) -> Option<DateTime<Utc>> {
        let start = Utc.timestamp_opt(SYNTHETIC_EPOCH, 0).single()?;
        let minutes = self
            .interval_minutes
            .checked_mul(i64::try_from(index).ok()?)?;
        start.checked_add_signed(Duration::try_minutes(minutes)?)
    }

    fn is_valid(&self) -> bool {
        self.bars > 0
            && self.start_price > 0.0
            && self.interval_minutes > 0
            && self.bar_time(self.bars - 1).is_some()
    }
}

/// Resolved origin of the bars for a run.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Csv(PathBuf),
    Synthetic(SyntheticSpec),
}

impl DataConfig {
    pub fn csv(path: impl Into<PathBuf>, symbol: impl Into<String>) -> Self {
        Self {
            csv: Some(path.into()),
            synthetic: None,
            symbol: symbol.into(),
        }
    }

    pub fn synthetic(spec: SyntheticSpec, symbol: impl Into<String>) -> Self {
        Self {
            csv: None,
            synthetic: Some(spec),
            symbol: symbol.into(),
        }
    }

    pub fn source(&self) -> Result<DataSource, ConfigError> {
        match (&self.csv, &self.synthetic) {
            (Some(path), None) => Ok(DataSource::Csv(path.clone())),
            (None, Some(spec)) => {
                if !spec.is_valid() {
                    return Err(ConfigError::Synthetic);
                }
                Ok(DataSource::Synthetic(*spec))
            }
            _ => Err(ConfigError::DataSource),
        }
    }
}

/// Paper broker settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Reject every intent, as a venue with trading disabled would.
    pub halted: bool,
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.data.source()?;
        self.strategy.validate()?;
        Ok(())
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from disk. A relative `csv` path is resolved against the
    /// config file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let (Some(csv), Some(dir)) = (config.data.csv.as_mut(), path.parent()) {
            if csv.is_relative() {
                *csv = dir.join(&*csv);
            }
        }
        Ok(config)
    }
}
