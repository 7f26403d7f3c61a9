//! Order intents — what the strategy asks the execution venue to do.
//!
//! An intent is a request, not an order or a fill. The venue decides whether
//! and how it is executed.

use crate::domain::OrderSide;
use serde::{Deserialize, Serialize};

/// Kind of exposure change requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentKind {
    None,
    OpenLong,
    CloseShort,
    OpenShort,
    CloseLong,
}

impl IntentKind {
    /// Order side needed to carry out the intent.
    pub fn side(&self) -> Option<OrderSide> {
        match self {
            IntentKind::None => None,
            IntentKind::OpenLong | IntentKind::CloseShort => Some(OrderSide::Buy),
            IntentKind::OpenShort | IntentKind::CloseLong => Some(OrderSide::Sell),
        }
    }
}

/// Protective distances in ticks, passed through to the venue unchanged.
/// Zero disables the corresponding order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Protection {
    pub stop_loss_ticks: u32,
    pub take_profit_ticks: u32,
}

/// A directional request with its size.
///
/// For entries, `volume` includes whatever is needed to flatten an opposite
/// position first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub kind: IntentKind,
    pub volume: f64,
    pub protection: Protection,
}

impl OrderIntent {
    pub fn none() -> Self {
        Self {
            kind: IntentKind::None,
            volume: 0.0,
            protection: Protection::default(),
        }
    }

    pub fn new(kind: IntentKind, volume: f64, protection: Protection) -> Self {
        Self {
            kind,
            volume,
            protection,
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind == IntentKind::None
    }

    /// Signed quantity: positive buys, negative sells, zero for no intent.
    pub fn signed_volume(&self) -> f64 {
        self.kind.side().map_or(0.0, |s| s.sign() * self.volume)
    }
}

impl Default for OrderIntent {
    fn default() -> Self {
        Self::none()
    }
}
