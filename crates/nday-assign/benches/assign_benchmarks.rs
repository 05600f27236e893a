//! Benchmarks for duration assignment over large selections.
//!
//! A browser selection can cover an entire deck, so assignment should stay
//! well under the time a dialog takes to close, even for tens of thousands of
//! cards.

use std::time::Duration;

use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use nday_assign::DurationAssignor;
use nday_core::types::{CardId, CardSignal};

/// Mix of reviewed and new cards, roughly one in five without a signal.
fn make_selection(size: usize) -> Vec<CardSignal> {
    (0..size)
        .map(|i| {
            let stability = if i % 5 == 0 {
                None
            } else {
                Some(((i * 7919) % 3650) as f64 / 10.0)
            };
            CardSignal::new(CardId(1_600_000_000_000 + i as i64), stability)
        })
        .collect()
}

fn bench_assign_range(c: &mut Criterion) {
    let assignor = DurationAssignor::default();
    let spec = assignor.parse("1-100").expect("valid spec");
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date");

    let mut group = c.benchmark_group("assign_range");
    group.measurement_time(Duration::from_secs(5));

    for size in [100usize, 1_000, 20_000] {
        let selection = make_selection(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &selection, |b, sel| {
            let mut rng = StdRng::seed_from_u64(1);
            b.iter(|| assignor.assign(sel, spec, today, &mut rng).expect("assign"));
        });
    }

    group.finish();
}

fn bench_parse_spec(c: &mut Criterion) {
    let assignor = DurationAssignor::default();
    c.bench_function("parse_spec", |b| {
        b.iter(|| {
            assignor.parse(" 1 - 100 ").expect("range");
            assignor.parse("10").expect("fixed");
        })
    });
}

criterion_group!(benches, bench_assign_range, bench_parse_spec);
criterion_main!(benches);
