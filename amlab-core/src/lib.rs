//! AMLab Core — the Adaptive Market Level filter and the strategy built on it.
//!
//! This crate contains:
//! - Domain types (bars, positions, fills, trades, instruments)
//! - Bar window, fractal dimension estimator and the AML smoother
//! - Direction tracker and order intents
//! - Position state machine and the execution venue trait
//! - Strategy configuration and deterministic fingerprints
//!
//! Everything here is synchronous and free of I/O: one finished bar in, one
//! `BarOutput` out.

pub mod config;
pub mod domain;
pub mod fingerprint;
pub mod indicators;
pub mod position_management;
pub mod signals;
pub mod strategy;

pub use config::{AmlStrategyConfig, ConfigError};
pub use strategy::{AmlStrategy, BarOutput};
