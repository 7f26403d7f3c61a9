use serde::{Deserialize, Serialize};

/// Step substituted when an instrument reports a non-positive price step.
pub const FALLBACK_STEP: f64 = 1.0;

/// True for a usable price step: positive and finite.
pub fn is_valid_step(step: f64) -> bool {
    step > 0.0 && step.is_finite()
}

/// Replace a missing or non-positive price step with [`FALLBACK_STEP`].
///
/// Silent; `AmlStrategyConfig::resolved` reports the substitution once.
pub fn effective_step(step: f64) -> f64 {
    if is_valid_step(step) {
        step
    } else {
        FALLBACK_STEP
    }
}

/// Instrument metadata: the minimum price increment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    pub step: f64,
}

impl Instrument {
    /// Create new instrument. A non-positive `step` becomes [`FALLBACK_STEP`].
    pub fn new(symbol: impl Into<String>, step: f64) -> Self {
        Self {
            symbol: symbol.into(),
            step: effective_step(step),
        }
    }

    /// Price distance covered by `ticks` steps.
    pub fn ticks_to_price(&self, ticks: u32) -> f64 {
        f64::from(ticks) * self.step
    }
}
