//! Replay runner: wires bars, the paper broker and one strategy together.
//!
//! Two entry points:
//! - `run_from_config()`: loads data as the `[data]` section says, then replays. Used by the CLI.
//! - `replay()`: takes pre-loaded bars, no I/O. Used by sweeps and tests.

use amlab_core::domain::{Bar, ExitReason, Fill, Instrument, TradeRecord};
use amlab_core::fingerprint::OutputFingerprint;
use amlab_core::signals::{Direction, IntentKind};
use amlab_core::{AmlStrategy, AmlStrategyConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::broker::PaperBroker;
use crate::config::{BrokerConfig, ConfigError, RunConfig};
use crate::data_loader::{load_bars, LoadError, LoadedData};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("strategy config error: {0}")]
    Strategy(#[from] amlab_core::ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("sweep grid is empty")]
    EmptyGrid,
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// One row of the per-bar output tape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    pub index: usize,
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub aml_value: Option<f64>,
    pub direction: Direction,
    pub intent: IntentKind,
    pub volume: f64,
    pub rejected: bool,
    /// Protective exit triggered by this bar's range, before the strategy ran.
    pub protective_exit: Option<ExitReason>,
    /// Net position after the bar.
    pub position: f64,
}

/// Headline numbers for one replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub bar_count: usize,
    pub warmup_bars: usize,
    pub intents_issued: usize,
    pub intents_rejected: usize,
    pub protective_exits: usize,
    pub trade_count: usize,
    pub win_rate: f64,
    pub final_position: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    /// BLAKE3 over the published value and intent of every bar.
    pub output_fingerprint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub config: AmlStrategyConfig,
    pub config_hash: String,
    pub dataset_hash: String,
    pub synthetic: bool,
    pub summary: RunSummary,
    pub records: Vec<BarRecord>,
    pub trades: Vec<TradeRecord>,
    pub fills: Vec<Fill>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Load bars and replay them, as described by a full run config.
pub fn run_from_config(config: &RunConfig) -> Result<ReplayResult, RunError> {
    config.validate()?;
    let data = load_bars(&config.data)?;
    replay(&config.strategy, &data, &config.broker)
}

/// Replay pre-loaded bars through a fresh strategy and paper broker.
///
/// Per bar: the broker checks protective exits and takes the bar's close,
/// then the strategy runs and may hand the broker one intent.
pub fn replay(
    config: &AmlStrategyConfig,
    data: &LoadedData,
    broker_config: &BrokerConfig,
) -> Result<ReplayResult, RunError> {
    config.validate()?;
    let config = &config.resolved();
    let config_hash = config.full_hash();
    info!(
        symbol = %data.symbol,
        fractal = config.fractal,
        lag = config.lag,
        config = config_hash.short(),
        "replay started"
    );

    let mut strategy = AmlStrategy::new(config.clone());
    let mut broker = PaperBroker::new(Instrument::new(data.symbol.clone(), config.step))
        .halted(broker_config.halted);
    let mut fingerprint = OutputFingerprint::new();

    let mut records = Vec::with_capacity(data.bars.len());
    let mut intents_issued = 0;
    let mut intents_rejected = 0;
    let mut protective_exits = 0;

    for (index, bar) in data.bars.iter().enumerate() {
        let protective_exit = broker.on_bar(index, bar);
        if protective_exit.is_some() {
            protective_exits += 1;
        }

        let output = strategy.on_bar(bar, &mut broker);
        fingerprint.record(&output);
        if !output.intent.is_none() {
            intents_issued += 1;
        }
        if output.rejection.is_some() {
            intents_rejected += 1;
        }

        records.push(record(index, bar, &output, protective_exit, broker_position(&broker)));
    }

    let trades = broker.trades().to_vec();
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    let summary = RunSummary {
        bar_count: data.bars.len(),
        warmup_bars: config.params().warmup_bars(),
        intents_issued,
        intents_rejected,
        protective_exits,
        trade_count: trades.len(),
        win_rate: if trades.is_empty() {
            0.0
        } else {
            winners as f64 / trades.len() as f64
        },
        final_position: broker_position(&broker),
        realized_pnl: broker.realized_pnl(),
        unrealized_pnl: broker.unrealized_pnl(),
        output_fingerprint: fingerprint.finish(),
    };

    info!(
        symbol = %data.symbol,
        bars = summary.bar_count,
        intents = summary.intents_issued,
        rejected = summary.intents_rejected,
        trades = summary.trade_count,
        realized_pnl = summary.realized_pnl,
        "replay finished"
    );

    Ok(ReplayResult {
        schema_version: SCHEMA_VERSION,
        symbol: data.symbol.clone(),
        config: config.clone(),
        config_hash: config_hash.0,
        dataset_hash: data.dataset_hash.clone(),
        synthetic: data.synthetic,
        summary,
        records,
        trades,
        fills: broker.fills().to_vec(),
    })
}

fn broker_position(broker: &PaperBroker) -> f64 {
    broker.net_position().quantity
}

fn record(
    index: usize,
    bar: &Bar,
    output: &amlab_core::BarOutput,
    protective_exit: Option<ExitReason>,
    position: f64,
) -> BarRecord {
    BarRecord {
        index,
        time: bar.time,
        open: bar.open,
        high: bar.high,
        low: bar.low,
        close: bar.close,
        aml_value: output.aml_value,
        direction: output.direction,
        intent: output.intent.kind,
        volume: output.intent.volume,
        rejected: output.rejection.is_some(),
        protective_exit,
        position,
    }
}
