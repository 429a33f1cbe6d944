//! Criterion benchmarks for the allocator and indicator hot paths.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use finboard_core::allocator::{allocate, AllocatorConfig, RiskProfile};
use finboard_core::domain::Bar;
use finboard_core::indicators::{compute_set, IndicatorSet};
use finboard_core::returns::ReturnMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn make_matrix(n_assets: usize, n_obs: usize) -> ReturnMatrix {
    let symbols = (0..n_assets).map(|i| format!("S{i}")).collect();
    let rows = (0..n_obs)
        .map(|t| {
            (0..n_assets)
                .map(|j| ((t * (j + 3)) as f64 * 0.37).sin() * 0.02)
                .collect()
        })
        .collect();
    ReturnMatrix::new(symbols, rows).unwrap()
}

fn make_bars(n: usize) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            Bar {
                date: base + chrono::Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                adj_close: close,
                volume: 1_000_000,
            }
        })
        .collect()
}

fn bench_allocate(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate");
    for n in [2usize, 5, 10] {
        let m = make_matrix(n, 252);
        group.bench_with_input(BenchmarkId::from_parameter(n), &m, |b, m| {
            b.iter(|| {
                let mut rng = StdRng::seed_from_u64(42);
                allocate(black_box(m), RiskProfile::Balanced, &AllocatorConfig::default(), &mut rng)
            })
        });
    }
    group.finish();
}

fn bench_indicators(c: &mut Criterion) {
    let bars = make_bars(1_260);
    c.bench_function("indicators_5y", |b| {
        b.iter(|| compute_set(&IndicatorSet::all(), black_box(&bars)))
    });
}

criterion_group!(benches, bench_allocate, bench_indicators);
criterion_main!(benches);
