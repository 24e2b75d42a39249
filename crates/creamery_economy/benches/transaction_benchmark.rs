//! Benchmark for buy, sell and exchange transactions.
//!
//! Run with: cargo bench --package creamery_economy --bench transaction_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use creamery_economy::{Amount, Economy, EconomyConfig, Multiplier};

fn create_rich_economy() -> Economy {
    let mut economy = EconomyConfig::creamery().unwrap().build().unwrap();
    for name in ["milk", "ice cream"] {
        let id = economy.resource_id(name).unwrap();
        economy.collect(id, Amount::from_whole(5000)).unwrap();
    }
    economy
}

fn benchmark_buy_sell_cycle(c: &mut Criterion) {
    let mut economy = create_rich_economy();
    let cow = economy.building_id("Cow").unwrap();

    c.bench_function("buy_sell_10_cows", |b| {
        b.iter(|| {
            for _ in 0..10 {
                economy.buy(cow).unwrap();
            }
            economy.sell(cow, 10).unwrap();
        });
    });
}

fn benchmark_failed_buy(c: &mut Criterion) {
    let mut economy = EconomyConfig::creamery().unwrap().build().unwrap();
    let cow = economy.building_id("Cow").unwrap();

    c.bench_function("buy_refused", |b| {
        b.iter(|| black_box(economy.buy(cow).is_err()));
    });
}

fn benchmark_available(c: &mut Criterion) {
    let economy = create_rich_economy();
    let ids: Vec<_> = economy.registry().iter().map(|b| b.id()).collect();

    c.bench_function("available_all_buildings", |b| {
        b.iter(|| ids.iter().filter(|id| economy.available(**id)).count());
    });
}

fn benchmark_convert(c: &mut Criterion) {
    let mut economy = create_rich_economy();
    let milk = economy.resource_id("milk").unwrap();
    let make_ice_cream = economy.exchange_id("make ice cream").unwrap();

    c.bench_function("convert_x10", |b| {
        b.iter(|| {
            if economy.convert(make_ice_cream, Multiplier::X10).is_err() {
                economy.collect(milk, Amount::from_whole(5000)).unwrap();
            }
        });
    });
}

criterion_group!(
    benches,
    benchmark_buy_sell_cycle,
    benchmark_failed_buy,
    benchmark_available,
    benchmark_convert
);
criterion_main!(benches);
