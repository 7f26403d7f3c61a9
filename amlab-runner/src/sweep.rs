//! Parameter sweep over `(fractal, lag)` grids.
//!
//! Every grid point gets its own strategy and paper broker, so points run
//! in parallel on rayon without shared state.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use amlab_core::AmlStrategyConfig;

use crate::config::BrokerConfig;
use crate::data_loader::LoadedData;
use crate::runner::{replay, RunError, RunSummary};

/// Values to sweep. Everything else comes from the base config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamGrid {
    pub fractals: Vec<usize>,
    pub lags: Vec<usize>,
}

impl ParamGrid {
    pub fn new(fractals: Vec<usize>, lags: Vec<usize>) -> Self {
        Self { fractals, lags }
    }

    /// Total number of configurations, including any later skipped.
    pub fn size(&self) -> usize {
        self.fractals.len() * self.lags.len()
    }

    /// Expands the grid around `base`. A zero fractal is skipped.
    pub fn generate_configs(&self, base: &AmlStrategyConfig) -> Vec<AmlStrategyConfig> {
        let mut configs = Vec::with_capacity(self.size());
        for &fractal in &self.fractals {
            if fractal == 0 {
                continue;
            }
            for &lag in &self.lags {
                configs.push(AmlStrategyConfig {
                    fractal,
                    lag,
                    ..base.clone()
                });
            }
        }
        configs
    }
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self::new(vec![4, 6, 8], vec![5, 7, 9])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepEntry {
    pub fractal: usize,
    pub lag: usize,
    pub config_hash: String,
    pub summary: RunSummary,
}

/// Sweep results, best realized PnL first.
#[derive(Debug)]
pub struct SweepResults {
    entries: Vec<SweepEntry>,
}

impl SweepResults {
    fn new(mut entries: Vec<SweepEntry>) -> Self {
        entries.sort_by(|a, b| {
            b.summary
                .realized_pnl
                .total_cmp(&a.summary.realized_pnl)
                .then(a.fractal.cmp(&b.fractal))
                .then(a.lag.cmp(&b.lag))
        });
        Self { entries }
    }

    pub fn all(&self) -> &[SweepEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn best(&self) -> Option<&SweepEntry> {
        self.entries.first()
    }

    pub fn top_n(&self, n: usize) -> &[SweepEntry] {
        &self.entries[..n.min(self.entries.len())]
    }
}

/// Replay every grid point over the same bars.
pub fn run_sweep(
    grid: &ParamGrid,
    base: &AmlStrategyConfig,
    data: &LoadedData,
    broker: &BrokerConfig,
) -> Result<SweepResults, RunError> {
    let configs = grid.generate_configs(&base.resolved());
    if configs.is_empty() {
        return Err(RunError::EmptyGrid);
    }
    info!(points = configs.len(), bars = data.bars.len(), "sweep started");

    let entries = configs
        .par_iter()
        .map(|config| {
            let result = replay(config, data, broker)?;
            Ok(SweepEntry {
                fractal: config.fractal,
                lag: config.lag,
                config_hash: result.config_hash,
                summary: result.summary,
            })
        })
        .collect::<Result<Vec<_>, RunError>>()?;

    let results = SweepResults::new(entries);
    if let Some(best) = results.best() {
        info!(
            fractal = best.fractal,
            lag = best.lag,
            realized_pnl = best.summary.realized_pnl,
            "sweep finished"
        );
    }
    Ok(results)
}
