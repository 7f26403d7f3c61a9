//! Paper broker: an in-memory execution venue for replays.
//!
//! Intents fill in full at the close of the most recent bar. After an entry
//! the broker arms protective levels at `entry ∓ ticks * step` and checks
//! them against the high/low of each following bar, before the strategy
//! sees that bar.
//!
//! Protective exit rules:
//! - Stop and target both inside one bar → the stop wins (worst case)
//! - Open already past a level → fill at the open (gap)

use amlab_core::domain::{
    Bar, ExitReason, Fill, Instrument, OrderSide, Position, PositionSide, TradeRecord,
};
use amlab_core::position_management::{ExecutionVenue, Rejection};
use amlab_core::signals::{OrderIntent, Protection};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Residual quantity treated as flat.
const FLAT_EPSILON: f64 = 1e-10;

/// Price levels armed for the open position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProtectiveLevels {
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl ProtectiveLevels {
    fn arm(side: PositionSide, entry: f64, protection: Protection, instrument: &Instrument) -> Self {
        let sign = match side {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
            PositionSide::Flat => return Self::default(),
        };
        let level = |ticks: u32, dir: f64| {
            (ticks > 0).then(|| entry + dir * instrument.ticks_to_price(ticks))
        };
        Self {
            stop_loss: level(protection.stop_loss_ticks, -sign),
            take_profit: level(protection.take_profit_ticks, sign),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct MarketPoint {
    index: usize,
    time: DateTime<Utc>,
    close: f64,
}

#[derive(Debug, Clone, Copy)]
struct OpenTrade {
    entry_bar: usize,
    entry_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PaperBroker {
    instrument: Instrument,
    halted: bool,
    position: Position,
    open_trade: Option<OpenTrade>,
    levels: ProtectiveLevels,
    last: Option<MarketPoint>,
    trades: Vec<TradeRecord>,
    fills: Vec<Fill>,
    realized_pnl: f64,
}

impl PaperBroker {
    pub fn new(instrument: Instrument) -> Self {
        Self {
            position: Position::new(instrument.symbol.clone()),
            instrument,
            halted: false,
            open_trade: None,
            levels: ProtectiveLevels::default(),
            last: None,
            trades: Vec::new(),
            fills: Vec::new(),
            realized_pnl: 0.0,
        }
    }

    pub fn halted(mut self, halted: bool) -> Self {
        self.halted = halted;
        self
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn net_position(&self) -> &Position {
        &self.position
    }

    pub fn levels(&self) -> ProtectiveLevels {
        self.levels
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    /// Open PnL marked at the last seen close.
    pub fn unrealized_pnl(&self) -> f64 {
        self.last
            .map_or(0.0, |m| self.position.unrealized_pnl(m.close))
    }

    /// Advance to a new bar: run protective exits against its range, then
    /// make its close the price for subsequent intents.
    pub fn on_bar(&mut self, index: usize, bar: &Bar) -> Option<ExitReason> {
        let exit = self.check_protection(index, bar);
        self.last = Some(MarketPoint {
            index,
            time: bar.time,
            close: bar.close,
        });
        exit
    }

    fn check_protection(&mut self, index: usize, bar: &Bar) -> Option<ExitReason> {
        let side = self.position.side();
        if side == PositionSide::Flat {
            return None;
        }
        let ProtectiveLevels {
            stop_loss,
            take_profit,
        } = self.levels;

        // Long exits sell into weakness; short exits buy into strength.
        let (stop_hit, target_hit) = match side {
            PositionSide::Long => (
                stop_loss.filter(|&s| bar.low <= s),
                take_profit.filter(|&t| bar.high >= t),
            ),
            _ => (
                stop_loss.filter(|&s| bar.high >= s),
                take_profit.filter(|&t| bar.low <= t),
            ),
        };

        let (reason, level) = match (stop_hit, target_hit) {
            (Some(s), _) => (ExitReason::StopLoss, s),
            (None, Some(t)) => (ExitReason::TakeProfit, t),
            (None, None) => return None,
        };
        let gapped = match side {
            PositionSide::Long => match reason {
                ExitReason::StopLoss => bar.open <= level,
                _ => bar.open >= level,
            },
            _ => match reason {
                ExitReason::StopLoss => bar.open >= level,
                _ => bar.open <= level,
            },
        };
        let price = if gapped { bar.open } else { level };

        debug!(time = %bar.time, ?reason, price, gapped, "protective exit");
        let quantity = -self.position.quantity;
        self.apply_fill(index, bar.time, quantity, price, reason);
        Some(reason)
    }

    /// Apply a signed fill, realizing PnL on any part that reduces the
    /// position. A fill larger than the position flips it.
    fn apply_fill(
        &mut self,
        index: usize,
        time: DateTime<Utc>,
        quantity: f64,
        price: f64,
        reason: ExitReason,
    ) {
        let side = if quantity > 0.0 {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        };
        self.fills.push(Fill {
            timestamp: time,
            symbol: self.instrument.symbol.clone(),
            side,
            price,
            quantity: quantity.abs(),
        });

        let current = self.position.quantity;
        let mut remaining = quantity;

        if current != 0.0 && current.signum() != quantity.signum() {
            let closing = quantity.abs().min(current.abs());
            let pnl = closing * (price - self.position.avg_entry_price) * current.signum();
            self.realized_pnl += pnl;

            let entry = self.open_trade.unwrap_or(OpenTrade {
                entry_bar: index,
                entry_time: time,
            });
            self.trades.push(TradeRecord {
                symbol: self.instrument.symbol.clone(),
                side: self.position.side(),
                entry_bar: entry.entry_bar,
                entry_time: entry.entry_time,
                entry_price: self.position.avg_entry_price,
                exit_bar: index,
                exit_time: time,
                exit_price: price,
                quantity: closing,
                pnl,
                exit_reason: reason,
            });

            self.position.quantity += closing * quantity.signum();
            remaining -= closing * quantity.signum();
            if self.position.quantity.abs() <= FLAT_EPSILON {
                self.position.quantity = 0.0;
                self.position.avg_entry_price = 0.0;
                self.open_trade = None;
                self.levels = ProtectiveLevels::default();
            }
        }

        if remaining.abs() > FLAT_EPSILON {
            let held = self.position.quantity.abs();
            let added = remaining.abs();
            self.position.avg_entry_price =
                (held * self.position.avg_entry_price + added * price) / (held + added);
            self.position.quantity += remaining;
            if held == 0.0 {
                self.open_trade = Some(OpenTrade {
                    entry_bar: index,
                    entry_time: time,
                });
            }
        }
    }
}

impl ExecutionVenue for PaperBroker {
    fn position(&self) -> f64 {
        self.position.quantity
    }

    fn submit(&mut self, intent: &OrderIntent) -> Result<(), Rejection> {
        if self.halted {
            return Err(Rejection::TradingHalted);
        }
        let Some(market) = self.last else {
            return Err(Rejection::NoMarketPrice);
        };
        if !(intent.volume > 0.0 && intent.volume.is_finite()) {
            return Err(Rejection::InvalidVolume(intent.volume.to_string()));
        }
        let quantity = intent.signed_volume();
        if quantity == 0.0 {
            return Err(Rejection::Other(format!("{:?} has no side", intent.kind)));
        }

        self.apply_fill(
            market.index,
            market.time,
            quantity,
            market.close,
            ExitReason::Signal,
        );
        if !self.position.is_flat() {
            self.levels = ProtectiveLevels::arm(
                self.position.side(),
                self.position.avg_entry_price,
                intent.protection,
                &self.instrument,
            );
        }
        Ok(())
    }
}
