//! Domain types for AMLab

pub mod bar;
pub mod fill;
pub mod instrument;
pub mod position;
pub mod trade;

pub use bar::{Bar, BarError};
pub use fill::{Fill, OrderSide};
pub use instrument::Instrument;
pub use position::{Position, PositionSide};
pub use trade::{ExitReason, TradeRecord};
