//! End-to-end optimization over a synthetic instrument.

use chrono::{Duration, NaiveDate};
use gridcross_core::{Bar, ParameterCombination, SecondaryParams, SimConfig, SimulationError};
use gridcross_runner::{
    rank_by_gain, rng_for, select_window, summarize_by_instrument, summarize_overall,
    GridOutcome, OptimizationDriver, ParamGrid, SampleWindow, SecondaryGrid,
};

fn synthetic_bars(n: usize) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2021, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n)
        .map(|i| {
            let t = i as f64;
            Bar {
                timestamp: start + Duration::days(i as i64),
                close: 100.0 + 15.0 * (t / 20.0).sin() + 0.05 * t,
            }
        })
        .collect()
}

fn full_window(bars: &[Bar]) -> SampleWindow {
    SampleWindow {
        start: 0,
        end: bars.len() - 1,
        degraded: false,
    }
}

#[test]
fn grid_runs_every_combination_once() {
    let bars = synthetic_bars(400);
    let grid = ParamGrid {
        ma_lengths: vec![3, 5, 8, 13],
        secondary: SecondaryGrid::ReentryGaps(vec![8.0, 12.0]),
    };
    let combinations = grid.combinations();
    assert_eq!(combinations.len(), 8);

    let driver = OptimizationDriver::new(Some(2)).unwrap();
    let outcome = driver
        .run_grid(
            "SYNTH",
            &bars,
            full_window(&bars),
            &combinations,
            &SimConfig::default(),
        )
        .unwrap();

    assert_eq!(outcome.results.len(), 8);
    assert!(outcome.failures.is_empty());
    for tagged in &outcome.results {
        assert_eq!(tagged.instrument, "SYNTH");
        assert_eq!(tagged.result.equity_curve.len(), bars.len() + 1);
    }
}

#[test]
fn failing_combination_does_not_sink_siblings() {
    let bars = synthetic_bars(50);
    let valid = ParameterCombination {
        short: 3,
        mid: 5,
        long: 8,
        secondary: SecondaryParams::ReentryGap { percent: 12.0 },
    };
    let too_long = ParameterCombination {
        short: 3,
        mid: 5,
        long: 500,
        secondary: SecondaryParams::ReentryGap { percent: 12.0 },
    };

    let driver = OptimizationDriver::new(Some(2)).unwrap();
    let outcome = driver
        .run_grid(
            "SYNTH",
            &bars,
            full_window(&bars),
            &[valid.clone(), too_long.clone()],
            &SimConfig::default(),
        )
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].combination, valid);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].combination, too_long);
    assert_eq!(
        outcome.failures[0].error,
        SimulationError::InsufficientData {
            required: 501,
            got: 50
        }
    );
}

#[test]
fn sampled_iterations_aggregate_per_combination() {
    let bars = synthetic_bars(600);
    let grid = ParamGrid {
        ma_lengths: vec![5, 10, 20],
        secondary: SecondaryGrid::ReentryGaps(vec![10.0]),
    };
    let combinations = grid.combinations();
    let config = SimConfig::default();
    let driver = OptimizationDriver::new(Some(2)).unwrap();

    let windows = [
        SampleWindow { start: 0, end: 199, degraded: false },
        SampleWindow { start: 150, end: 399, degraded: false },
        SampleWindow { start: 300, end: 599, degraded: false },
    ];
    let mut collected = GridOutcome::default();
    for window in windows {
        let outcome = driver
            .run_grid("SYNTH", &bars, window, &combinations, &config)
            .unwrap();
        collected.absorb(outcome);
    }

    let per_instrument = summarize_by_instrument(&collected.results);
    assert_eq!(per_instrument.len(), 1);
    assert_eq!(per_instrument[0].run_count, windows.len());
    assert_eq!(per_instrument[0].instrument.as_deref(), Some("SYNTH"));

    let overall = summarize_overall(&collected.results);
    assert_eq!(overall.len(), 1);
    assert_eq!(overall[0].instrument, None);

    let ranked = rank_by_gain(overall);
    assert_eq!(ranked.len(), 1);
}

#[test]
fn identical_seeds_reproduce_identical_outcomes() {
    let bars = synthetic_bars(500);
    let combination = ParameterCombination {
        short: 5,
        mid: 10,
        long: 20,
        secondary: SecondaryParams::ReentryGap { percent: 10.0 },
    };
    let config = SimConfig::default();
    let driver = OptimizationDriver::new(Some(2)).unwrap();

    // Same seed, same sampled window.
    let mut rng_a = rng_for(11, "SYNTH", 0);
    let mut rng_b = rng_for(11, "SYNTH", 0);
    assert_eq!(
        select_window(&bars, Duration::days(60), &mut rng_a).unwrap(),
        select_window(&bars, Duration::days(60), &mut rng_b).unwrap()
    );

    // Same window, same simulation outcome, regardless of worker scheduling.
    let window = full_window(&bars);
    let run = || {
        driver
            .run_grid("SYNTH", &bars, window, &[combination.clone()], &config)
            .unwrap()
            .results
            .remove(0)
    };
    let a = run();
    let b = run();
    assert_eq!(a.result.final_balance, b.result.final_balance);
    assert_eq!(a.result.closed_trades.len(), b.result.closed_trades.len());
    assert_eq!(a.result.equity_curve, b.result.equity_curve);
}
