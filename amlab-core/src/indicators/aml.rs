//! Adaptive Market Level (AML).
//!
//! Per finished bar:
//! 1. D = fractal dimension of the last 2F bars (see `fractal`).
//! 2. alpha = exp(-Lag * (D - 1)), clamped to [0.01, 1].
//! 3. smoothed[t] = alpha * P + (1 - alpha) * smoothed[t-1], P = weighted price,
//!    seeded with P on the first ready bar.
//! 4. published = smoothed[t] only if |smoothed[t] - smoothed[t-Lag]| >= Lag^2 * Step,
//!    otherwise the previous published value is kept.
//!
//! The first value is published on bar 2F (index 2F - 1, the `Indicator`
//! lookback), seeded with the first smoothed value. It cannot move until Lag+1
//! smoothed values exist, so the earliest bar the gate can fire on is
//! bar 2F + Lag (`AmlParams::warmup_bars`).

use super::fractal::FractalDimension;
use super::window::{BarWindow, Ohlc};
use super::Indicator;
use crate::domain::instrument::effective_step;
use crate::domain::Bar;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

pub const MIN_ALPHA: f64 = 0.01;
pub const MAX_ALPHA: f64 = 1.0;

/// `exp(-lag * (dimension - 1))` clamped to `[MIN_ALPHA, MAX_ALPHA]`.
pub fn adaptive_alpha(dimension: f64, lag: usize) -> f64 {
    (-(lag as f64) * (dimension - 1.0))
        .exp()
        .clamp(MIN_ALPHA, MAX_ALPHA)
}

/// Filter parameters. `step` has already had the non-positive fallback applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmlParams {
    pub fractal: usize,
    pub lag: usize,
    pub step: f64,
}

impl AmlParams {
    pub fn new(fractal: usize, lag: usize, step: f64) -> Self {
        assert!(fractal >= 1, "fractal must be >= 1");
        Self {
            fractal,
            lag,
            step: effective_step(step),
        }
    }

    /// Bar window capacity: max(Lag + 1, 2 * Fractal).
    pub fn window_len(&self) -> usize {
        (self.lag + 1).max(2 * self.fractal)
    }

    /// Minimum move between smoothed values Lag bars apart that gets published.
    pub fn threshold(&self) -> f64 {
        (self.lag as f64).powi(2) * self.step
    }

    /// Bars fed before the gate is formed: 2F for the first smoothed value,
    /// then Lag more. The last of these is the first that can fire.
    pub fn warmup_bars(&self) -> usize {
        2 * self.fractal + self.lag
    }
}

/// What the hysteresis gate did on a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateState {
    /// Fewer than Lag+1 smoothed values; published holds its seed.
    Warming,
    /// Move below threshold; published unchanged.
    Held,
    /// Move at or above threshold; published replaced by the smoothed value.
    Fired,
}

/// One bar's worth of filter output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmlReading {
    pub dimension: f64,
    pub alpha: f64,
    pub price: f64,
    pub smoothed: f64,
    /// Smoothed value Lag bars back, once available.
    pub reference: Option<f64>,
    pub gate: GateState,
    /// Published value before this bar.
    pub previous: Option<f64>,
    /// Published value after this bar.
    pub value: f64,
}

impl AmlReading {
    pub fn changed(&self) -> bool {
        self.previous.is_some_and(|p| p != self.value)
    }
}

/// Streaming AML state: the bar window, the smoothed series and the published value.
///
/// `step` is the pure transition; `update` applies it in place.
#[derive(Debug, Clone, PartialEq)]
pub struct AmlFilter {
    params: AmlParams,
    estimator: FractalDimension,
    window: BarWindow,
    /// Newest first, at most Lag + 1 values.
    smoothed: VecDeque<f64>,
    published: Option<f64>,
}

impl AmlFilter {
    pub fn new(params: AmlParams) -> Self {
        Self {
            params,
            estimator: FractalDimension::new(params.fractal),
            window: BarWindow::new(params.window_len()),
            smoothed: VecDeque::with_capacity(params.lag + 1),
            published: None,
        }
    }

    pub fn params(&self) -> &AmlParams {
        &self.params
    }

    /// Current published value, `None` before the first ready bar.
    pub fn value(&self) -> Option<f64> {
        self.published
    }

    pub fn window(&self) -> &BarWindow {
        &self.window
    }

    /// Smoothed series, newest first.
    pub fn smoothed_series(&self) -> impl Iterator<Item = f64> + '_ {
        self.smoothed.iter().copied()
    }

    /// True once the gate is able to fire.
    pub fn is_formed(&self) -> bool {
        self.smoothed.len() > self.params.lag
    }

    /// Drop all buffered state and start warm-up again.
    pub fn reset(&mut self) {
        self.window.clear();
        self.smoothed.clear();
        self.published = None;
    }

    /// Pure transition: returns the next state and this bar's reading.
    pub fn step(&self, bar: &Bar) -> (Self, Option<AmlReading>) {
        let mut next = self.clone();
        let reading = next.update(bar);
        (next, reading)
    }

    /// Feed one finished bar. Returns `None` while the window is still filling.
    pub fn update(&mut self, bar: &Bar) -> Option<AmlReading> {
        self.window.push(Ohlc::from(bar));

        let dimension = self.estimator.estimate(&self.window).ok()?;
        let alpha = adaptive_alpha(dimension, self.params.lag);
        let price = bar.weighted_price();
        let prior = self.smoothed.front().copied().unwrap_or(price);
        let smoothed = alpha * price + (1.0 - alpha) * prior;

        self.smoothed.push_front(smoothed);
        self.smoothed.truncate(self.params.lag + 1);

        let previous = self.published;
        let reference = self.smoothed.get(self.params.lag).copied();
        let gate = match reference {
            None => GateState::Warming,
            Some(r) if (smoothed - r).abs() >= self.params.threshold() => {
                self.published = Some(smoothed);
                GateState::Fired
            }
            Some(_) => GateState::Held,
        };
        let value = *self.published.get_or_insert(smoothed);

        if gate == GateState::Fired && previous != Some(value) {
            debug!(time = %bar.time, dimension, alpha, value, "aml published");
        }

        Some(AmlReading {
            dimension,
            alpha,
            price,
            smoothed,
            reference,
            gate,
            previous,
            value,
        })
    }
}

/// Batch form of the filter for charting: one value per bar, NaN while warming.
#[derive(Debug, Clone)]
pub struct Aml {
    params: AmlParams,
    name: String,
}

impl Aml {
    pub fn new(params: AmlParams) -> Self {
        Self {
            name: format!("aml_{}_{}", params.fractal, params.lag),
            params,
        }
    }
}

impl Indicator for Aml {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.params.fractal - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut filter = AmlFilter::new(self.params);
        bars.iter()
            .map(|bar| filter.update(bar).map_or(f64::NAN, |r| r.value))
            .collect()
    }
}
