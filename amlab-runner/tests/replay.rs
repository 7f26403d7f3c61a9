//! End-to-end replays: TOML config + CSV on disk → artifacts.

use amlab_core::domain::{Bar, ExitReason};
use amlab_core::signals::IntentKind;
use amlab_core::AmlStrategyConfig;
use amlab_runner::{
    load_bars, replay, run_from_config, run_sweep, save_artifacts, write_bars_csv, BrokerConfig,
    DataConfig, LoadedData, ParamGrid, RunConfig,
};
use chrono::{TimeZone, Utc};

/// 15 bars up, 15 bars down, repeated; open = previous close, 1.0 wicks.
fn zigzag_bars(n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let closes: Vec<f64> = (0..n)
        .map(|i| {
            let k = (i % 15) as f64;
            if (i / 15) % 2 == 0 {
                100.0 + 2.0 * k
            } else {
                128.0 - 2.0 * k
            }
        })
        .collect();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                base + chrono::Duration::hours(i as i64),
                "ZZ".into(),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                500.0,
            )
        })
        .collect()
}

fn write_csv(dir: &std::path::Path, bars: &[Bar]) -> std::path::PathBuf {
    let path = dir.join("bars.csv");
    let file = std::fs::File::create(&path).unwrap();
    write_bars_csv(file, bars).unwrap();
    path
}

fn unprotected(fractal: usize, lag: usize) -> AmlStrategyConfig {
    AmlStrategyConfig {
        fractal,
        lag,
        step: 0.01,
        stop_loss_ticks: 0,
        take_profit_ticks: 0,
        ..AmlStrategyConfig::default()
    }
}

#[test]
fn toml_and_csv_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(dir.path(), &zigzag_bars(90));
    let config_path = dir.path().join("run.toml");
    std::fs::write(
        &config_path,
        r#"
[data]
csv = "bars.csv"
symbol = "ZZ"

[strategy]
fractal = 3
lag = 2
step = 0.01
stop_loss_ticks = 0
take_profit_ticks = 0
"#,
    )
    .unwrap();

    let config = RunConfig::from_file(&config_path).unwrap();
    let result = run_from_config(&config).unwrap();
    assert_eq!(result.summary.bar_count, 90);
    assert!(!result.synthetic);

    // Reversals alternate and every one after the first carries the
    // opposite position.
    let intents: Vec<_> = result
        .records
        .iter()
        .filter(|r| r.intent != IntentKind::None)
        .collect();
    assert!(intents.len() >= 2);
    assert_eq!(intents[0].intent, IntentKind::OpenLong);
    for pair in intents.windows(2) {
        assert_ne!(pair[0].intent, pair[1].intent);
    }
    for r in &intents[1..] {
        assert_eq!(r.volume, 2.0);
    }

    assert_eq!(result.trades.len(), intents.len() - 1);
    assert!(result
        .trades
        .iter()
        .all(|t| t.exit_reason == ExitReason::Signal));
    assert_eq!(result.summary.final_position.abs(), 1.0);

    let run_dir = save_artifacts(&result, dir.path()).unwrap();
    let bars_csv = std::fs::read_to_string(run_dir.join("bars.csv")).unwrap();
    assert_eq!(bars_csv.lines().count(), 91);
}

#[test]
fn csv_and_in_memory_bars_agree() {
    let dir = tempfile::tempdir().unwrap();
    let bars = zigzag_bars(60);
    let path = write_csv(dir.path(), &bars);

    let from_disk = load_bars(&DataConfig::csv(&path, "ZZ")).unwrap();
    let in_memory = LoadedData::from_bars("ZZ", bars, false);
    assert_eq!(from_disk.dataset_hash, in_memory.dataset_hash);

    let config = unprotected(3, 2);
    let a = replay(&config, &from_disk, &BrokerConfig::default()).unwrap();
    let b = replay(&config, &in_memory, &BrokerConfig::default()).unwrap();
    assert_eq!(a.summary.output_fingerprint, b.summary.output_fingerprint);
}

#[test]
fn tight_stops_fire_on_next_bar() {
    let data = LoadedData::from_bars("ZZ", zigzag_bars(90), false);
    let config = AmlStrategyConfig {
        stop_loss_ticks: 1,
        ..unprotected(3, 2)
    };
    let result = replay(&config, &data, &BrokerConfig::default()).unwrap();
    assert!(result.summary.protective_exits > 0);
    assert!(result
        .trades
        .iter()
        .any(|t| t.exit_reason == ExitReason::StopLoss));
    // A stopped-out position is closed before the next reversal arrives.
    for r in result.records.iter().filter(|r| r.protective_exit.is_some()) {
        if r.intent == IntentKind::None {
            assert_eq!(r.position, 0.0);
        }
    }
}

#[test]
fn stopped_out_position_waits_for_next_reversal() {
    let data = LoadedData::from_bars("ZZ", zigzag_bars(120), false);
    let config = AmlStrategyConfig {
        stop_loss_ticks: 1,
        ..unprotected(3, 2)
    };
    let result = replay(&config, &data, &BrokerConfig::default()).unwrap();
    assert_eq!(result.summary.intents_rejected, 0);
    assert!(result.summary.protective_exits > 0);

    // Entries only happen on a direction change, never on a flat-after-stop bar.
    for pair in result.records.windows(2) {
        if pair[1].intent != IntentKind::None {
            assert_ne!(pair[0].direction, pair[1].direction);
        }
    }

    // Once flat after a stop, the position stays flat until the direction turns.
    let records = &result.records;
    for (i, r) in records.iter().enumerate() {
        if r.protective_exit.is_none() || r.intent != IntentKind::None {
            continue;
        }
        assert_eq!(r.position, 0.0);
        for later in &records[i + 1..] {
            if later.direction != r.direction {
                break;
            }
            assert_eq!(later.intent, IntentKind::None);
            assert_eq!(later.position, 0.0);
        }
    }
}

#[test]
fn halted_broker_keeps_flat() {
    let data = LoadedData::from_bars("ZZ", zigzag_bars(90), false);
    let result = replay(&unprotected(3, 2), &data, &BrokerConfig { halted: true }).unwrap();
    assert!(result.summary.intents_issued > 0);
    assert_eq!(result.summary.intents_issued, result.summary.intents_rejected);
    assert!(result.records.iter().all(|r| r.position == 0.0));
    assert!(result.fills.is_empty());
}

#[test]
fn sweep_is_reproducible() {
    let data = LoadedData::from_bars("ZZ", zigzag_bars(120), false);
    let grid = ParamGrid::new(vec![2, 3, 4], vec![1, 2, 3]);
    let base = unprotected(3, 2);
    let first = run_sweep(&grid, &base, &data, &BrokerConfig::default()).unwrap();
    let second = run_sweep(&grid, &base, &data, &BrokerConfig::default()).unwrap();
    assert_eq!(first.len(), 9);
    for (a, b) in first.all().iter().zip(second.all()) {
        assert_eq!(a.config_hash, b.config_hash);
        assert_eq!(a.summary, b.summary);
    }
}
