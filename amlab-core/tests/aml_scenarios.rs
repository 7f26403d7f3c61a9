//! End-to-end scenarios for the AML strategy.
//!
//! 1. Strictly rising closes: stepwise rise, one long entry after warm-up.
//! 2. Flat bars: degenerate dimension, frozen value, no intents for any flags.
//! 3. Warm-up: nothing moves before the gate has Lag + 1 smoothed values.
//! 4. Stop/reset: a reset strategy replays identically.
//! 5. Rejection: the bar after a refused intent is decided again from the
//!    current direction, so a venue that recovers still gets the entry.

mod common;

use amlab_core::fingerprint::OutputFingerprint;
use amlab_core::indicators::GateState;
use amlab_core::signals::{Direction, IntentKind, Transition};
use amlab_core::{AmlStrategy, AmlStrategyConfig, BarOutput};
use common::{bars_from_closes, flat_bars, RecordingVenue};

fn config(fractal: usize, lag: usize, step: f64) -> AmlStrategyConfig {
    AmlStrategyConfig {
        fractal,
        lag,
        step,
        ..AmlStrategyConfig::default()
    }
}

fn run(config: AmlStrategyConfig, bars: &[amlab_core::domain::Bar]) -> (Vec<BarOutput>, RecordingVenue) {
    let mut strategy = AmlStrategy::new(config);
    let mut venue = RecordingVenue::default();
    let outputs = bars.iter().map(|b| strategy.on_bar(b, &mut venue)).collect();
    (outputs, venue)
}

// ── 1. Rising closes ─────────────────────────────────────────────────

#[test]
fn rising_closes_open_one_long() {
    let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
    let bars = bars_from_closes(&closes);
    let (outputs, venue) = run(config(5, 5, 0.01), &bars);

    // No value until two fractal halves are buffered.
    for out in &outputs[..9] {
        assert!(out.aml_value.is_none());
    }

    // Seed held while the gate warms up (bars 9..=13).
    let seed = outputs[9].aml_value.unwrap();
    for out in &outputs[9..14] {
        assert_eq!(out.aml_value, Some(seed));
        assert_eq!(out.reading.unwrap().gate, GateState::Warming);
        assert!(out.intent.is_none());
        assert_eq!(out.direction, Direction::Flat);
    }

    // From bar 14 on the value climbs and direction is Up.
    let mut last = seed;
    for out in &outputs[14..] {
        let value = out.aml_value.unwrap();
        assert!(value > last, "published must step upward");
        last = value;
        assert_eq!(out.direction, Direction::Up);
    }

    assert_eq!(outputs[14].transition, Some(Transition::DownToUp));
    assert_eq!(outputs[14].intent.kind, IntentKind::OpenLong);
    assert_eq!(venue.accepted.len(), 1);
    assert_eq!(venue.accepted[0].kind, IntentKind::OpenLong);
    assert_eq!(venue.accepted[0].volume, 1.0);
    assert_eq!(venue.position, 1.0);
}

#[test]
fn rising_closes_without_long_entries_stay_flat() {
    let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
    let bars = bars_from_closes(&closes);
    let mut cfg = config(5, 5, 0.01);
    cfg.buy_pos_open = false;
    let (outputs, venue) = run(cfg, &bars);

    assert!(venue.accepted.is_empty());
    assert_eq!(outputs[14].transition, Some(Transition::DownToUp));
    assert!(outputs[14].intent.is_none());
}

// ── 2. Flat bars ─────────────────────────────────────────────────────

#[test]
fn flat_bars_freeze_value_for_every_flag_combination() {
    let bars = flat_bars(42.0, 30);
    for mask in 0u8..16 {
        let cfg = AmlStrategyConfig {
            buy_pos_open: mask & 1 != 0,
            sell_pos_open: mask & 2 != 0,
            buy_pos_close: mask & 4 != 0,
            sell_pos_close: mask & 8 != 0,
            ..config(5, 5, 0.01)
        };
        let (outputs, venue) = run(cfg, &bars);

        for out in outputs.iter().skip(9) {
            let reading = out.reading.unwrap();
            assert_eq!(reading.dimension, 0.0);
            assert_eq!(out.aml_value, Some(42.0));
            assert!(out.intent.is_none());
            assert!(out.transition.is_none());
        }
        assert!(venue.accepted.is_empty());
    }
}

// ── 3. Warm-up ───────────────────────────────────────────────────────

#[test]
fn lag_dominated_warmup_holds_first_smoothed_value() {
    // N = max(Lag + 1, 2F) = 9; feed 8 bars of a strong trend.
    let closes: Vec<f64> = (0..8).map(|i| 100.0 + 5.0 * i as f64).collect();
    let bars = bars_from_closes(&closes);
    let (outputs, venue) = run(config(2, 8, 0.01), &bars);

    let first = outputs.iter().find_map(|o| o.reading).unwrap();
    for out in outputs.iter().filter(|o| o.reading.is_some()) {
        assert_eq!(out.aml_value, Some(first.smoothed));
        assert!(out.transition.is_none());
    }
    assert!(venue.accepted.is_empty());
}

// ── 4. Reset ─────────────────────────────────────────────────────────

#[test]
fn reset_strategy_reproduces_fingerprint() {
    let closes: Vec<f64> = (0..120)
        .map(|i| 100.0 + 10.0 * (i as f64 / 9.0).sin() + 0.05 * i as f64)
        .collect();
    let bars = bars_from_closes(&closes);
    let mut strategy = AmlStrategy::new(config(4, 3, 0.01));

    let mut fingerprints = Vec::new();
    for _ in 0..2 {
        let mut venue = RecordingVenue::default();
        let mut fp = OutputFingerprint::new();
        for bar in &bars {
            fp.record(&strategy.on_bar(bar, &mut venue));
        }
        fingerprints.push((fp.finish(), venue.accepted.len()));
        strategy.reset();
    }

    assert_eq!(fingerprints[0], fingerprints[1]);
    assert!(fingerprints[0].1 > 0, "sine wave should produce intents");
}

#[test]
fn entry_rejected_while_halted_is_taken_after_resume() {
    let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
    let bars = bars_from_closes(&closes);
    let mut strategy = AmlStrategy::new(config(5, 5, 0.01));
    let mut venue = RecordingVenue::default();

    let mut outputs = Vec::new();
    for (i, bar) in bars.iter().enumerate() {
        venue.halted = i == 14;
        outputs.push(strategy.on_bar(bar, &mut venue));
    }

    assert_eq!(outputs[14].transition, Some(Transition::DownToUp));
    assert!(outputs[14].rejection.is_some());

    let resumed = &outputs[15];
    assert!(resumed.transition.is_none());
    assert!(resumed.retried);
    assert_eq!(resumed.intent.kind, IntentKind::OpenLong);
    assert_eq!(resumed.intent.volume, 1.0);
    assert!(resumed.accepted());

    assert_eq!(venue.rejected.len(), 1);
    assert_eq!(venue.accepted.len(), 1);
    assert_eq!(venue.position, 1.0);
    for out in &outputs[16..] {
        assert!(out.intent.is_none());
        assert!(!out.retried);
    }
}

#[test]
fn halted_venue_sees_one_entry_attempt_per_bar() {
    let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
    let bars = bars_from_closes(&closes);
    let mut strategy = AmlStrategy::new(config(5, 5, 0.01));
    let mut venue = RecordingVenue {
        halted: true,
        ..RecordingVenue::default()
    };
    let outputs: Vec<_> = bars.iter().map(|b| strategy.on_bar(b, &mut venue)).collect();

    assert!(outputs[..14].iter().all(|o| o.intent.is_none()));
    assert_eq!(venue.rejected.len(), 6);
    assert!(venue
        .rejected
        .iter()
        .all(|i| i.kind == IntentKind::OpenLong && i.volume == 1.0));
    assert!(outputs[15..].iter().all(|o| o.retried && o.rejection.is_some()));
    assert_eq!(venue.position, 0.0);
}
