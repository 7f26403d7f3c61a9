//! Fractal dimension estimate from sub-window ranges.
//!
//! R1 = range(F, 0) / F, R2 = range(F, F) / F, R3 = range(2F, 0) / 2F
//! D  = log2(R1 + R2) - log2(R3), or 0 when either side is degenerate.
//!
//! D near 1 reads as a trending path, near 2 as noise.

use super::window::{BarWindow, NotReady};

/// `log2(r1 + r2) - log2(r3)`, with 0 for a flat (degenerate) window.
pub fn dimension_from_ranges(r1: f64, r2: f64, r3: f64) -> f64 {
    if r1 + r2 > 0.0 && r3 > 0.0 {
        (r1 + r2).log2() - r3.log2()
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FractalDimension {
    fractal: usize,
}

impl FractalDimension {
    pub fn new(fractal: usize) -> Self {
        assert!(fractal >= 1, "fractal must be >= 1");
        Self { fractal }
    }

    pub fn fractal(&self) -> usize {
        self.fractal
    }

    /// Bars needed before an estimate is possible.
    pub fn bars_required(&self) -> usize {
        2 * self.fractal
    }

    pub fn estimate(&self, window: &BarWindow) -> Result<f64, NotReady> {
        let f = self.fractal;
        let r3 = window.range(2 * f, 0)? / (2 * f) as f64;
        let r1 = window.range(f, 0)? / f as f64;
        let r2 = window.range(f, f)? / f as f64;
        Ok(dimension_from_ranges(r1, r2, r3))
    }
}
