use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gridcross_core::{
    moving_average, run_simulation, Bar, MaKind, ParameterCombination, SecondaryParams, SimConfig,
};

fn synthetic_bars(n: usize) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n)
        .map(|i| {
            let t = i as f64;
            Bar {
                timestamp: start + Duration::hours(i as i64),
                close: 100.0 + 20.0 * (t / 50.0).sin() + 0.01 * t,
            }
        })
        .collect()
}

fn bench_moving_averages(c: &mut Criterion) {
    let closes: Vec<f64> = synthetic_bars(10_000).iter().map(|b| b.close).collect();
    c.bench_function("sma_50_10k_bars", |b| {
        b.iter(|| moving_average(black_box(&closes), 50, MaKind::Sma))
    });
    c.bench_function("ema_50_10k_bars", |b| {
        b.iter(|| moving_average(black_box(&closes), 50, MaKind::Ema))
    });
}

fn bench_simulation(c: &mut Criterion) {
    let bars = synthetic_bars(10_000);
    let combination = ParameterCombination {
        short: 14,
        mid: 30,
        long: 50,
        secondary: SecondaryParams::ReentryGap { percent: 10.0 },
    };
    let config = SimConfig::default();

    c.bench_function("simulation_10k_bars", |b| {
        b.iter(|| run_simulation(black_box(&bars), black_box(&combination), black_box(&config)))
    });
}

criterion_group!(benches, bench_moving_averages, bench_simulation);
criterion_main!(benches);
