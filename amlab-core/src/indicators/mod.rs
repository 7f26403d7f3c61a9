//! The Adaptive Market Level indicator and its building blocks.
//!
//! - `window`: rolling OHLC store with sub-window ranges
//! - `fractal`: fractal dimension estimate from three ranges
//! - `aml`: adaptive exponential smoother with a hysteresis gate
//!
//! The filter is streaming (`AmlFilter::update`), with a batch `Indicator`
//! wrapper (`Aml`) for charting and diagnostics.

pub mod aml;
pub mod fractal;
pub mod window;

pub use aml::{adaptive_alpha, Aml, AmlFilter, AmlParams, AmlReading, GateState};
pub use fractal::{dimension_from_ranges, FractalDimension};
pub use window::{BarWindow, NotReady, Ohlc};

use crate::domain::Bar;

/// Batch indicator: bar history in, one value per bar out.
///
/// The first `lookback()` values are `f64::NAN` (warmup). No value at bar t
/// may depend on bars after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "aml_6_7").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Create synthetic hourly bars from close prices for testing.
///
/// open = prev_close (or close for first bar), high = max(open,close) + 1.0,
/// low = min(open,close) - 1.0.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                base + chrono::Duration::hours(i as i64),
                "TEST".to_string(),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000.0,
            )
        })
        .collect()
}

/// `n` bars with open == high == low == close == `price`.
#[cfg(test)]
pub fn flat_bars(price: f64, n: usize) -> Vec<Bar> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            Bar::new(
                base + chrono::Duration::hours(i as i64),
                "TEST".to_string(),
                price,
                price,
                price,
                price,
                0.0,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
