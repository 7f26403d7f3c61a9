//! Bar loading for the runner.
//!
//! Bars come from one of two places:
//! 1. A CSV file (`time,open,high,low,close[,volume]`)
//! 2. A seeded random walk, for offline runs and tests
//!
//! Every loaded series is checked before it reaches the strategy: each bar
//! must be sane and timestamps must be strictly increasing.

use std::io;
use std::path::Path;

use amlab_core::domain::{Bar, BarError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{DataConfig, DataSource, SyntheticSpec};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid data config: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("row {row}: unrecognised time '{value}'")]
    BadTime { row: usize, value: String },

    #[error("row {row}: {source}")]
    BadBar { row: usize, source: BarError },

    #[error("row {row}: time {time} is not after {previous}")]
    OutOfOrder {
        row: usize,
        time: DateTime<Utc>,
        previous: DateTime<Utc>,
    },

    #[error("no bars in {0}")]
    Empty(String),
}

/// Bars ready for replay, with provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub symbol: String,
    pub bars: Vec<Bar>,
    /// BLAKE3 over every bar, for run fingerprinting.
    pub dataset_hash: String,
    pub synthetic: bool,
}

impl LoadedData {
    pub fn from_bars(symbol: impl Into<String>, bars: Vec<Bar>, synthetic: bool) -> Self {
        let dataset_hash = dataset_hash(&bars);
        Self {
            symbol: symbol.into(),
            bars,
            dataset_hash,
            synthetic,
        }
    }
}

/// CSV row layout, shared by reader and writer.
#[derive(Debug, Serialize, Deserialize)]
struct CsvBar {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

/// Load bars as described by a `[data]` section.
pub fn load_bars(config: &DataConfig) -> Result<LoadedData, LoadError> {
    let loaded = match config.source()? {
        DataSource::Csv(path) => {
            let bars = load_csv(&path, &config.symbol)?;
            LoadedData::from_bars(&config.symbol, bars, false)
        }
        DataSource::Synthetic(spec) => {
            LoadedData::from_bars(&config.symbol, synthetic_bars(&spec, &config.symbol), true)
        }
    };
    info!(
        symbol = %loaded.symbol,
        bars = loaded.bars.len(),
        synthetic = loaded.synthetic,
        dataset = &loaded.dataset_hash[..8],
        "bars loaded"
    );
    Ok(loaded)
}

/// Read and validate a CSV file of bars.
pub fn load_csv(path: &Path, symbol: &str) -> Result<Vec<Bar>, LoadError> {
    let file = std::fs::File::open(path).map_err(csv::Error::from)?;
    let bars = read_csv(file, symbol)?;
    if bars.is_empty() {
        return Err(LoadError::Empty(path.display().to_string()));
    }
    Ok(bars)
}

/// Parse bars from any reader with a header row. Rows are numbered from 1,
/// excluding the header.
pub fn read_csv<R: io::Read>(reader: R, symbol: &str) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    for (i, row) in rdr.deserialize::<CsvBar>().enumerate() {
        let row_no = i + 1;
        let raw = row?;
        let time = parse_time(&raw.time).ok_or_else(|| LoadError::BadTime {
            row: row_no,
            value: raw.time.clone(),
        })?;
        bars.push(Bar::new(
            time,
            symbol.to_string(),
            raw.open,
            raw.high,
            raw.low,
            raw.close,
            raw.volume,
        ));
    }
    validate_sequence(&bars)?;
    Ok(bars)
}

/// Accepts RFC 3339, `%Y-%m-%d %H:%M:%S` and bare `%Y-%m-%d` (midnight UTC).
pub fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(t.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// Every bar sane, times strictly increasing.
pub fn validate_sequence(bars: &[Bar]) -> Result<(), LoadError> {
    let mut previous: Option<DateTime<Utc>> = None;
    for (i, bar) in bars.iter().enumerate() {
        let row = i + 1;
        bar.validate()
            .map_err(|source| LoadError::BadBar { row, source })?;
        if let Some(prev) = previous {
            if bar.time <= prev {
                return Err(LoadError::OutOfOrder {
                    row,
                    time: bar.time,
                    previous: prev,
                });
            }
        }
        previous = Some(bar.time);
    }
    Ok(())
}

/// Write bars in the layout `read_csv` accepts.
pub fn write_bars_csv<W: io::Write>(writer: W, bars: &[Bar]) -> Result<(), LoadError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for bar in bars {
        wtr.serialize(CsvBar {
            time: bar.time.to_rfc3339(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        })?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Deterministic BLAKE3 hash over times and OHLCV values.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.time.timestamp().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Seeded random walk. The same spec always yields the same bars.
///
/// Generation stops early if a bar time would leave chrono's range.
pub fn synthetic_bars(spec: &SyntheticSpec, symbol: &str) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(spec.seed);

    let mut bars = Vec::with_capacity(spec.bars);
    let mut price = spec.start_price;
    for i in 0..spec.bars {
        let Some(time) = spec.bar_time(i) else {
            warn!(index = i, interval_minutes = spec.interval_minutes, "synthetic bar time out of range");
            break;
        };
        let bar_return: f64 = rng.gen_range(-0.01..0.01);
        let open = price;
        let close = price * (1.0 + bar_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.004));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.004));
        let volume = rng.gen_range(100.0..10_000.0);

        bars.push(Bar::new(
            time,
            symbol.to_string(),
            open,
            high,
            low,
            close,
            volume,
        ));
        price = close;
    }
    bars
}
