//! Run artifacts: per-bar tape, trade list and manifest.
//!
//! A run directory holds:
//! - `bars.csv` — one row per bar with the published value and intent
//! - `trades.csv` — closed round trips
//! - `manifest.json` — config, hashes and summary
//!
//! The manifest carries a `schema_version`; newer versions are rejected on load.

use std::path::{Path, PathBuf};

use amlab_core::domain::TradeRecord;
use amlab_core::AmlStrategyConfig;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::runner::{BarRecord, ReplayResult, RunSummary, SCHEMA_VERSION};
use crate::sweep::SweepResults;

/// Everything about a run except the tapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub symbol: String,
    pub synthetic: bool,
    pub config: AmlStrategyConfig,
    pub config_hash: String,
    pub dataset_hash: String,
    pub summary: RunSummary,
}

impl RunManifest {
    pub fn from_result(result: &ReplayResult) -> Self {
        Self {
            schema_version: result.schema_version,
            symbol: result.symbol.clone(),
            synthetic: result.synthetic,
            config: result.config.clone(),
            config_hash: result.config_hash.clone(),
            dataset_hash: result.dataset_hash.clone(),
            summary: result.summary.clone(),
        }
    }
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_manifest_json(manifest: &RunManifest) -> Result<String> {
    serde_json::to_string_pretty(manifest).context("failed to serialize manifest to JSON")
}

pub fn import_manifest_json(json: &str) -> Result<RunManifest> {
    let manifest: RunManifest =
        serde_json::from_str(json).context("failed to deserialize manifest from JSON")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Columns: index, time, open, high, low, close, aml, direction, intent,
/// volume, rejected, protective_exit, position
pub fn export_bars_csv(records: &[BarRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "index",
        "time",
        "open",
        "high",
        "low",
        "close",
        "aml",
        "direction",
        "intent",
        "volume",
        "rejected",
        "protective_exit",
        "position",
    ])?;

    for r in records {
        wtr.write_record([
            &r.index.to_string(),
            &r.time.to_rfc3339(),
            &r.open.to_string(),
            &r.high.to_string(),
            &r.low.to_string(),
            &r.close.to_string(),
            &r.aml_value.map(|v| v.to_string()).unwrap_or_default(),
            &format!("{:?}", r.direction),
            &format!("{:?}", r.intent),
            &r.volume.to_string(),
            &r.rejected.to_string(),
            &r.protective_exit.map(|e| format!("{e:?}")).unwrap_or_default(),
            &r.position.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: symbol, side, entry_bar, entry_time, entry_price, exit_bar,
/// exit_time, exit_price, quantity, pnl, bars_held, exit_reason
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "side",
        "entry_bar",
        "entry_time",
        "entry_price",
        "exit_bar",
        "exit_time",
        "exit_price",
        "quantity",
        "pnl",
        "bars_held",
        "exit_reason",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.symbol,
            &format!("{:?}", t.side),
            &t.entry_bar.to_string(),
            &t.entry_time.to_rfc3339(),
            &format!("{:.6}", t.entry_price),
            &t.exit_bar.to_string(),
            &t.exit_time.to_rfc3339(),
            &format!("{:.6}", t.exit_price),
            &format!("{:.6}", t.quantity),
            &format!("{:.6}", t.pnl),
            &t.bars_held().to_string(),
            &format!("{:?}", t.exit_reason),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per grid point, in ranking order.
pub fn export_sweep_csv(results: &SweepResults) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "fractal",
        "lag",
        "intents",
        "trades",
        "win_rate",
        "realized_pnl",
        "unrealized_pnl",
        "config_hash",
    ])?;
    for (rank, e) in results.all().iter().enumerate() {
        wtr.write_record([
            &(rank + 1).to_string(),
            &e.fractal.to_string(),
            &e.lag.to_string(),
            &e.summary.intents_issued.to_string(),
            &e.summary.trade_count.to_string(),
            &format!("{:.4}", e.summary.win_rate),
            &format!("{:.6}", e.summary.realized_pnl),
            &format!("{:.6}", e.summary.unrealized_pnl),
            &e.config_hash,
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the full artifact set under `output_dir/{symbol}_{config}_{dataset}/`.
///
/// The directory name is derived from hashes, so rerunning the same inputs
/// overwrites the same directory. Returns its path.
pub fn save_artifacts(result: &ReplayResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}_{}",
        result.symbol,
        short(&result.config_hash),
        short(&result.dataset_hash)
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let manifest = RunManifest::from_result(result);
    std::fs::write(run_dir.join("manifest.json"), export_manifest_json(&manifest)?)?;
    std::fs::write(run_dir.join("bars.csv"), export_bars_csv(&result.records)?)?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&result.trades)?)?;

    Ok(run_dir)
}

/// Load the manifest from a run directory.
pub fn load_manifest(dir: &Path) -> Result<RunManifest> {
    let path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_manifest_json(&json)
}

fn short(hash: &str) -> &str {
    &hash[..hash.len().min(8)]
}
