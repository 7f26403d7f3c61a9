//! Strategy configuration: filter parameters, order size, protection and
//! the four enable flags.

use crate::domain::instrument::{is_valid_step, FALLBACK_STEP};
use crate::fingerprint::ConfigHash;
use crate::indicators::AmlParams;
use crate::position_management::TradeFlags;
use crate::signals::Protection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("fractal must be >= 1, got {0}")]
    InvalidFractal(usize),

    #[error("volume must be a positive finite number, got {0}")]
    InvalidVolume(f64),

    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Everything needed to build one AML strategy instance.
///
/// A non-positive `step` is not an error: the filter substitutes 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmlStrategyConfig {
    pub fractal: usize,
    pub lag: usize,
    pub step: f64,
    pub volume: f64,
    pub stop_loss_ticks: u32,
    pub take_profit_ticks: u32,
    pub buy_pos_open: bool,
    pub sell_pos_open: bool,
    pub buy_pos_close: bool,
    pub sell_pos_close: bool,
}

impl Default for AmlStrategyConfig {
    fn default() -> Self {
        Self {
            fractal: 6,
            lag: 7,
            step: 0.01,
            volume: 1.0,
            stop_loss_ticks: 1000,
            take_profit_ticks: 2000,
            buy_pos_open: true,
            sell_pos_open: true,
            buy_pos_close: true,
            sell_pos_close: true,
        }
    }
}

impl AmlStrategyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fractal == 0 {
            return Err(ConfigError::InvalidFractal(self.fractal));
        }
        if !(self.volume > 0.0 && self.volume.is_finite()) {
            return Err(ConfigError::InvalidVolume(self.volume));
        }
        Ok(())
    }

    /// Parse and validate a bare strategy table.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Copy with an invalid `step` replaced by [`FALLBACK_STEP`]. Warns once
    /// per call that substitutes; a resolved config passes through unchanged.
    pub fn resolved(&self) -> Self {
        if is_valid_step(self.step) {
            return self.clone();
        }
        warn!(step = self.step, fallback = FALLBACK_STEP, "invalid price step, substituting fallback");
        Self {
            step: FALLBACK_STEP,
            ..self.clone()
        }
    }

    pub fn params(&self) -> AmlParams {
        AmlParams::new(self.fractal, self.lag, self.step)
    }

    pub fn flags(&self) -> TradeFlags {
        TradeFlags {
            buy_pos_open: self.buy_pos_open,
            sell_pos_open: self.sell_pos_open,
            buy_pos_close: self.buy_pos_close,
            sell_pos_close: self.sell_pos_close,
        }
    }

    pub fn protection(&self) -> Protection {
        Protection {
            stop_loss_ticks: self.stop_loss_ticks,
            take_profit_ticks: self.take_profit_ticks,
        }
    }

    /// Exact identity of the parameter set: every field, in declaration order.
    pub fn full_hash(&self) -> ConfigHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.fractal as u64).to_le_bytes());
        hasher.update(&(self.lag as u64).to_le_bytes());
        hasher.update(&self.step.to_bits().to_le_bytes());
        hasher.update(&self.volume.to_bits().to_le_bytes());
        hasher.update(&self.stop_loss_ticks.to_le_bytes());
        hasher.update(&self.take_profit_ticks.to_le_bytes());
        hasher.update(&[
            u8::from(self.buy_pos_open),
            u8::from(self.sell_pos_open),
            u8::from(self.buy_pos_close),
            u8::from(self.sell_pos_close),
        ]);
        ConfigHash::from_hasher(&hasher)
    }
}
