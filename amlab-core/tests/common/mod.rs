//! Shared helpers for core integration tests.

#![allow(dead_code)]

use amlab_core::domain::Bar;
use amlab_core::position_management::{ExecutionVenue, Rejection};
use amlab_core::signals::OrderIntent;
use chrono::{TimeZone, Utc};

/// Hourly bars from closes: open = previous close, wicks of 1.0 either side.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                base + chrono::Duration::hours(i as i64),
                "TEST".into(),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1_000.0,
            )
        })
        .collect()
}

/// Bars with open == high == low == close.
pub fn flat_bars(price: f64, n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            Bar::new(
                base + chrono::Duration::hours(i as i64),
                "TEST".into(),
                price,
                price,
                price,
                price,
                0.0,
            )
        })
        .collect()
}

/// Venue that fills every accepted intent in full, or rejects everything
/// while halted.
#[derive(Debug, Default)]
pub struct RecordingVenue {
    pub position: f64,
    pub halted: bool,
    pub accepted: Vec<OrderIntent>,
    pub rejected: Vec<OrderIntent>,
}

impl ExecutionVenue for RecordingVenue {
    fn position(&self) -> f64 {
        self.position
    }

    fn submit(&mut self, intent: &OrderIntent) -> Result<(), Rejection> {
        if self.halted {
            self.rejected.push(*intent);
            return Err(Rejection::TradingHalted);
        }
        self.position += intent.signed_volume();
        self.accepted.push(*intent);
        Ok(())
    }
}
