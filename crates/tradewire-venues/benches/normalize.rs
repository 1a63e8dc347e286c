//! Benchmarks for payload normalization
//!
//! Run with: cargo bench --bench normalize

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};
use tradewire_types::{CurrencyPair, SymbolFormat};
use tradewire_venues::normalize::{depth_from_rows, DepthColumns, KlineColumns, TimeUnit};

/// N string-encoded levels, interleaved so the sort has work to do
fn create_rows(base: i64, count: usize, step: i64) -> Vec<Value> {
    (0..count as i64)
        .map(|i| {
            let offset = if i % 2 == 0 { i } else { count as i64 - i };
            json!([format!("{}.25", base + step * offset), format!("{}.5", i + 1)])
        })
        .collect()
}

fn create_candles(count: usize) -> Vec<Value> {
    (0..count as i64)
        .rev()
        .map(|i| {
            json!([
                1_625_097_600_000i64 + i * 60_000,
                "100.0",
                "105.0",
                "99.0",
                "104.5",
                "1200.125"
            ])
        })
        .collect()
}

fn bench_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("depth_from_rows");

    for size in [20, 100, 1000] {
        let bids = create_rows(30_000, size, -1);
        let asks = create_rows(30_001, size, 1);
        group.throughput(Throughput::Elements(size as u64 * 2));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                depth_from_rows(
                    black_box(&CurrencyPair::BTC_USDT),
                    black_box(&bids),
                    black_box(&asks),
                    DepthColumns::PRICE_AMOUNT,
                    size / 2,
                    0,
                )
            })
        });
    }

    group.finish();
}

fn bench_klines(c: &mut Criterion) {
    let mut group = c.benchmark_group("klines");
    let columns = KlineColumns::ohlcv(TimeUnit::Millis);

    for size in [100, 500, 1000] {
        let rows = create_candles(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| columns.klines(black_box(&CurrencyPair::BTC_USDT), black_box(&rows), size))
        });
    }

    group.finish();
}

fn bench_symbols(c: &mut Criterion) {
    let joined = SymbolFormat::upper("");
    let reversed = SymbolFormat::upper("_").reversed();
    let quotes = ["USDT", "USD", "BTC"];

    c.bench_function("symbol_render", |b| {
        b.iter(|| reversed.render(black_box(&CurrencyPair::ETH_BTC)))
    });

    c.bench_function("symbol_parse_with_quotes", |b| {
        b.iter(|| joined.parse_with_quotes(black_box("ETHUSDT"), &quotes))
    });
}

criterion_group!(benches, bench_depth, bench_klines, bench_symbols);
criterion_main!(benches);
