//! Benchmark for the production tick and the refresh-rate reads.
//!
//! Run with: cargo bench --package creamery_economy --bench tick_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use creamery_economy::{Amount, Economy, EconomyConfig};

/// The built-in game with a mid-game stock of buildings.
fn create_busy_economy() -> Economy {
    let mut economy = EconomyConfig::creamery().unwrap().build().unwrap();
    let milk = economy.resource_id("milk").unwrap();
    let ice_cream = economy.resource_id("ice cream").unwrap();

    economy.collect(milk, Amount::from_whole(5000)).unwrap();
    economy.collect(ice_cream, Amount::from_whole(5000)).unwrap();

    for name in ["Cow", "Factory", "Vanilla Plantation", "Strawberry Field", "Chocolate Processor"] {
        let id = economy.building_id(name).unwrap();
        while economy.available(id) && economy.building(id).unwrap().count() < 25 {
            economy.buy(id).unwrap();
        }
    }

    economy
}

fn benchmark_tick(c: &mut Criterion) {
    let mut economy = create_busy_economy();

    c.bench_function("production_tick", |b| {
        b.iter(|| black_box(economy.tick()));
    });
}

fn benchmark_refresh_visibility(c: &mut Criterion) {
    let mut economy = create_busy_economy();

    c.bench_function("refresh_visibility", |b| {
        b.iter(|| black_box(economy.refresh_visibility()));
    });
}

fn benchmark_snapshot(c: &mut Criterion) {
    let economy = create_busy_economy();

    c.bench_function("snapshot", |b| {
        b.iter(|| black_box(economy.snapshot()));
    });
}

fn benchmark_long_replay(c: &mut Criterion) {
    c.bench_function("replay_1000_ticks", |b| {
        b.iter(|| {
            let mut economy = create_busy_economy();
            for _ in 0..1000 {
                economy.tick();
            }
            black_box(economy.tick_count())
        });
    });
}

criterion_group!(
    benches,
    benchmark_tick,
    benchmark_refresh_visibility,
    benchmark_snapshot,
    benchmark_long_replay
);
criterion_main!(benches);
