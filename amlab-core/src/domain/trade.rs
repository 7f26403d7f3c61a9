//! TradeRecord — a completed round-trip trade.

use super::position::PositionSide;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Closed or reversed by a strategy intent.
    Signal,
    StopLoss,
    TakeProfit,
}

/// A complete round-trip trade record: entry → exit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub side: PositionSide,

    pub entry_bar: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,

    pub exit_bar: usize,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,

    pub quantity: f64,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

impl TradeRecord {
    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    /// Return on the trade as a fraction of entry cost.
    pub fn return_pct(&self) -> f64 {
        if self.entry_price == 0.0 || self.quantity == 0.0 {
            return 0.0;
        }
        self.pnl / (self.entry_price * self.quantity)
    }
}
