//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A finished OHLCV bar for a single symbol.
///
/// The core assumes every bar it receives is closed; partial bars are filtered
/// out by the feed before they get here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum BarError {
    #[error("bar at {time} has a NaN field")]
    Void { time: DateTime<Utc> },

    #[error("bar at {time} is inconsistent: open={open} high={high} low={low} close={close}")]
    Inconsistent {
        time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
}

impl Bar {
    pub fn new(
        time: DateTime<Utc>,
        symbol: String,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            symbol,
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    /// Like `is_sane`, but says what is wrong.
    pub fn validate(&self) -> Result<(), BarError> {
        if self.is_void() {
            return Err(BarError::Void { time: self.time });
        }
        if !self.is_sane() {
            return Err(BarError::Inconsistent {
                time: self.time,
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }
        Ok(())
    }

    /// `(high + low + 2*open + 2*close) / 6`
    pub fn weighted_price(&self) -> f64 {
        (self.high + self.low + 2.0 * self.open + 2.0 * self.close) / 6.0
    }
}
