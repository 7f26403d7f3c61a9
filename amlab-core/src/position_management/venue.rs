//! Execution venue — the collaborator that owns positions, fills and
//! protective orders.
//!
//! The strategy only reads the signed net position and submits intents.
//! Submission is fire-and-forget: a rejection is reported back once and never
//! retried within the same bar.

use crate::signals::OrderIntent;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the venue refused an intent.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Rejection {
    #[error("trading halted")]
    TradingHalted,
    #[error("no market price available")]
    NoMarketPrice,
    #[error("invalid volume {0}")]
    InvalidVolume(String),
    #[error("rejected: {0}")]
    Other(String),
}

pub trait ExecutionVenue {
    /// Signed net position: positive long, negative short, zero flat.
    fn position(&self) -> f64;

    /// Hand an intent to the venue.
    fn submit(&mut self, intent: &OrderIntent) -> Result<(), Rejection>;
}
