//! Bar Window — fixed-capacity rolling OHLC store, newest first.

use crate::domain::Bar;
use std::collections::VecDeque;
use std::fmt;

/// The OHLC part of a bar, which is all the window needs to keep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ohlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl From<&Bar> for Ohlc {
    fn from(bar: &Bar) -> Self {
        Self {
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
        }
    }
}

/// Not enough bars buffered yet. Expected during warm-up, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotReady {
    pub needed: usize,
    pub available: usize,
}

impl fmt::Display for NotReady {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "need {} bars, have {}", self.needed, self.available)
    }
}

/// Rolling window of the most recent `capacity` bars.
///
/// Index 0 is the newest bar. Once full, every push evicts the oldest entry.
#[derive(Debug, Clone, PartialEq)]
pub struct BarWindow {
    capacity: usize,
    bars: VecDeque<Ohlc>,
}

impl BarWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "window capacity must be >= 1");
        Self {
            capacity,
            bars: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, bar: Ohlc) {
        if self.bars.len() == self.capacity {
            self.bars.pop_back();
        }
        self.bars.push_front(bar);
    }

    /// Bar `bars_back` steps back from the newest (0 = newest).
    pub fn get(&self, bars_back: usize) -> Option<&Ohlc> {
        self.bars.get(bars_back)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.bars.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.bars.clear();
    }

    /// `max(high) - min(low)` over `period` bars starting `offset` bars back.
    pub fn range(&self, period: usize, offset: usize) -> Result<f64, NotReady> {
        let needed = offset + period;
        if period == 0 || self.bars.len() < needed {
            return Err(NotReady {
                needed: needed.max(1),
                available: self.bars.len(),
            });
        }

        let (high, low) = self
            .bars
            .iter()
            .skip(offset)
            .take(period)
            .fold((f64::NEG_INFINITY, f64::INFINITY), |(hi, lo), b| {
                (hi.max(b.high), lo.min(b.low))
            });
        Ok(high - low)
    }
}
