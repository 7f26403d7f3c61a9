//! AMLab Runner — bar replay, paper broker, parameter sweeps and artifacts.
//!
//! This crate builds on `amlab-core` to provide:
//! - Run configuration from TOML
//! - Data loading from CSV or a seeded random walk
//! - A paper broker implementing `ExecutionVenue` with protective exits
//! - Single replays with output fingerprinting
//! - Parallel `(fractal, lag)` sweeps
//! - CSV and JSON run artifacts

pub mod broker;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod sweep;

pub use broker::{PaperBroker, ProtectiveLevels};
pub use config::{BrokerConfig, ConfigError, DataConfig, DataSource, RunConfig, SyntheticSpec};
pub use data_loader::{load_bars, synthetic_bars, write_bars_csv, LoadError, LoadedData};
pub use export::{save_artifacts, RunManifest};
pub use runner::{replay, run_from_config, BarRecord, ReplayResult, RunError, RunSummary};
pub use sweep::{run_sweep, ParamGrid, SweepEntry, SweepResults};
