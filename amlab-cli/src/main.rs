//! AMLab CLI — replay, sweep and synthetic data commands.
//!
//! Commands:
//! - `run` — replay one parameter set from a TOML config and/or flags, save artifacts
//! - `sweep` — replay a `(fractal, lag)` grid in parallel and rank by realized PnL
//! - `synth` — write a seeded random-walk bar file

use std::path::{Path, PathBuf};

use amlab_core::AmlStrategyConfig;
use amlab_runner::export::export_sweep_csv;
use amlab_runner::{
    load_bars, run_from_config, run_sweep, save_artifacts, synthetic_bars, write_bars_csv,
    BrokerConfig, DataConfig, ParamGrid, ReplayResult, RunConfig, SweepResults, SyntheticSpec,
};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "amlab=info,amlab_core=info,amlab_runner=info";
const VERBOSE_FILTER: &str = "amlab=debug,amlab_core=debug,amlab_runner=debug";

#[derive(Parser)]
#[command(name = "amlab", about = "AMLab CLI — adaptive market level replay and sweeps")]
struct Cli {
    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay one parameter set and save bars.csv, trades.csv and manifest.json.
    Run {
        /// Path to a TOML run config. Flags below override it.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        params: ParamArgs,

        /// Reject every intent.
        #[arg(long, default_value_t = false)]
        halted: bool,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Replay a grid of fractal and lag values over the same bars.
    Sweep {
        /// Path to a TOML run config supplying data and base parameters.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        params: ParamArgs,

        /// Fractal values, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = vec![4, 6, 8])]
        fractals: Vec<usize>,

        /// Lag values, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = vec![5, 7, 9])]
        lags: Vec<usize>,

        /// Rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Write the full ranking as CSV.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write synthetic random-walk bars as CSV.
    Synth {
        #[arg(long, default_value_t = 500)]
        bars: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 100.0)]
        start_price: f64,

        #[arg(long, default_value_t = 60)]
        interval_minutes: i64,

        #[arg(long, default_value = "SYNTH")]
        symbol: String,

        /// Output CSV file.
        #[arg(long)]
        out: PathBuf,
    },
}

/// Where bars come from when not (only) given by `--config`.
#[derive(Args)]
struct DataArgs {
    /// CSV file with time,open,high,low,close[,volume].
    #[arg(long, conflicts_with = "synthetic")]
    csv: Option<PathBuf>,

    /// Use a seeded random walk instead of a file.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Synthetic bar count.
    #[arg(long, default_value_t = 500)]
    bars: usize,

    /// Synthetic seed.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long)]
    symbol: Option<String>,
}

/// Strategy overrides.
#[derive(Args)]
struct ParamArgs {
    #[arg(long)]
    fractal: Option<usize>,

    #[arg(long)]
    lag: Option<usize>,

    #[arg(long)]
    step: Option<f64>,

    #[arg(long)]
    volume: Option<f64>,

    #[arg(long)]
    stop_loss_ticks: Option<u32>,

    #[arg(long)]
    take_profit_ticks: Option<u32>,

    /// Disable short entries and short exits.
    #[arg(long, default_value_t = false)]
    long_only: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            data,
            params,
            halted,
            output_dir,
        } => {
            let mut run_config = resolve_config(config.as_deref(), &data, &params)?;
            run_config.broker.halted |= halted;
            run_cmd(&run_config, &output_dir)
        }
        Commands::Sweep {
            config,
            data,
            params,
            fractals,
            lags,
            top,
            output,
        } => {
            let run_config = resolve_config(config.as_deref(), &data, &params)?;
            sweep_cmd(&run_config, ParamGrid::new(fractals, lags), top, output.as_deref())
        }
        Commands::Synth {
            bars,
            seed,
            start_price,
            interval_minutes,
            symbol,
            out,
        } => synth_cmd(
            &SyntheticSpec {
                bars,
                seed,
                start_price,
                interval_minutes,
            },
            &symbol,
            &out,
        ),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Merge the optional config file with command-line data and parameter flags.
fn resolve_config(
    path: Option<&Path>,
    data: &DataArgs,
    params: &ParamArgs,
) -> Result<RunConfig> {
    let file_config = path.map(RunConfig::from_file).transpose()?;

    let symbol = data
        .symbol
        .clone()
        .or_else(|| file_config.as_ref().map(|c| c.data.symbol.clone()))
        .unwrap_or_else(|| "SYNTH".to_string());

    let data_config = if let Some(csv) = &data.csv {
        DataConfig::csv(csv, symbol)
    } else if data.synthetic {
        DataConfig::synthetic(
            SyntheticSpec {
                bars: data.bars,
                seed: data.seed,
                ..SyntheticSpec::default()
            },
            symbol,
        )
    } else if let Some(c) = &file_config {
        DataConfig {
            symbol,
            ..c.data.clone()
        }
    } else {
        bail!("one of --config, --csv or --synthetic is required");
    };

    let (strategy, broker) = match file_config {
        Some(c) => (c.strategy, c.broker),
        None => (AmlStrategyConfig::default(), BrokerConfig::default()),
    };

    let config = RunConfig {
        data: data_config,
        strategy: apply_overrides(strategy, params),
        broker,
    };
    config.validate()?;
    Ok(config)
}

fn apply_overrides(mut s: AmlStrategyConfig, p: &ParamArgs) -> AmlStrategyConfig {
    if let Some(v) = p.fractal {
        s.fractal = v;
    }
    if let Some(v) = p.lag {
        s.lag = v;
    }
    if let Some(v) = p.step {
        s.step = v;
    }
    if let Some(v) = p.volume {
        s.volume = v;
    }
    if let Some(v) = p.stop_loss_ticks {
        s.stop_loss_ticks = v;
    }
    if let Some(v) = p.take_profit_ticks {
        s.take_profit_ticks = v;
    }
    if p.long_only {
        s.sell_pos_open = false;
        s.sell_pos_close = false;
    }
    s
}

fn run_cmd(config: &RunConfig, output_dir: &Path) -> Result<()> {
    let result = run_from_config(config)?;
    print_summary(&result);

    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn sweep_cmd(config: &RunConfig, grid: ParamGrid, top: usize, output: Option<&Path>) -> Result<()> {
    let data = load_bars(&config.data)?;
    let results = run_sweep(&grid, &config.strategy, &data, &config.broker)?;
    print_sweep(&results, top);

    if let Some(path) = output {
        std::fs::write(path, export_sweep_csv(&results)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Ranking saved to: {}", path.display());
    }
    Ok(())
}

fn synth_cmd(spec: &SyntheticSpec, symbol: &str, out: &Path) -> Result<()> {
    if spec.bars == 0 {
        bail!("--bars must be > 0");
    }
    let bars = synthetic_bars(spec, symbol);
    let file = std::fs::File::create(out)
        .with_context(|| format!("failed to create {}", out.display()))?;
    write_bars_csv(file, &bars)?;
    info!(bars = bars.len(), path = %out.display(), "synthetic bars written");
    println!("Wrote {} bars to {}", bars.len(), out.display());
    Ok(())
}

fn print_summary(result: &ReplayResult) {
    let s = &result.summary;
    let c = &result.config;
    println!();
    println!("=== AML Replay ===");
    println!(
        "Symbol:        {}{}",
        result.symbol,
        if result.synthetic { " (synthetic)" } else { "" }
    );
    println!(
        "Parameters:    fractal={} lag={} step={} volume={}",
        c.fractal, c.lag, c.step, c.volume
    );
    println!("Bars:          {} ({} warm-up)", s.bar_count, s.warmup_bars);
    println!(
        "Intents:       {} issued, {} rejected",
        s.intents_issued, s.intents_rejected
    );
    println!(
        "Trades:        {} ({:.1}% winners, {} protective exits)",
        s.trade_count,
        s.win_rate * 100.0,
        s.protective_exits
    );
    println!("Position:      {}", s.final_position);
    println!("Realized PnL:  {:.4}", s.realized_pnl);
    println!("Open PnL:      {:.4}", s.unrealized_pnl);
    println!("Config hash:   {}", result.config_hash);
    println!("Dataset hash:  {}", result.dataset_hash);
    println!("Fingerprint:   {}", s.output_fingerprint);
    println!();
}

fn print_sweep(results: &SweepResults, top: usize) {
    println!();
    println!("=== AML Sweep ({} points) ===", results.len());
    println!(
        "{:>4}  {:>7}  {:>4}  {:>7}  {:>6}  {:>7}  {:>12}",
        "rank", "fractal", "lag", "intents", "trades", "win%", "realized"
    );
    for (i, e) in results.top_n(top).iter().enumerate() {
        println!(
            "{:>4}  {:>7}  {:>4}  {:>7}  {:>6}  {:>6.1}%  {:>12.4}",
            i + 1,
            e.fractal,
            e.lag,
            e.summary.intents_issued,
            e.summary.trade_count,
            e.summary.win_rate * 100.0,
            e.summary.realized_pnl
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_params() -> ParamArgs {
        ParamArgs {
            fractal: None,
            lag: None,
            step: None,
            volume: None,
            stop_loss_ticks: None,
            take_profit_ticks: None,
            long_only: false,
        }
    }

    fn synthetic_args() -> DataArgs {
        DataArgs {
            csv: None,
            synthetic: true,
            bars: 120,
            seed: 1,
            symbol: None,
        }
    }

    #[test]
    fn cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn sweep_lists_parse() {
        let cli = Cli::try_parse_from([
            "amlab", "sweep", "--synthetic", "--fractals", "3,5", "--lags", "2,4,6",
        ])
        .unwrap();
        match cli.command {
            Commands::Sweep { fractals, lags, .. } => {
                assert_eq!(fractals, vec![3, 5]);
                assert_eq!(lags, vec![2, 4, 6]);
            }
            _ => panic!("expected sweep"),
        }
    }

    #[test]
    fn requires_a_data_source() {
        let data = DataArgs {
            synthetic: false,
            ..synthetic_args()
        };
        assert!(resolve_config(None, &data, &no_params()).is_err());
    }

    #[test]
    fn overrides_apply_on_defaults() {
        let params = ParamArgs {
            fractal: Some(3),
            lag: Some(2),
            long_only: true,
            ..no_params()
        };
        let config = resolve_config(None, &synthetic_args(), &params).unwrap();
        assert_eq!(config.strategy.fractal, 3);
        assert_eq!(config.strategy.lag, 2);
        assert!(!config.strategy.sell_pos_open);
        assert!(config.strategy.buy_pos_open);
        assert_eq!(config.data.symbol, "SYNTH");
    }

    #[test]
    fn invalid_override_is_rejected() {
        let params = ParamArgs {
            fractal: Some(0),
            ..no_params()
        };
        assert!(resolve_config(None, &synthetic_args(), &params).is_err());
    }

    #[test]
    fn config_file_supplies_data_and_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(
            &path,
            "[data]\nsymbol = \"EURUSD\"\nsynthetic = { bars = 80 }\n[strategy]\nlag = 4\n",
        )
        .unwrap();
        let data = DataArgs {
            synthetic: false,
            ..synthetic_args()
        };
        let config = resolve_config(Some(&path), &data, &no_params()).unwrap();
        assert_eq!(config.data.symbol, "EURUSD");
        assert_eq!(config.strategy.lag, 4);
        assert_eq!(config.data.synthetic.map(|s| s.bars), Some(80));
    }
}
