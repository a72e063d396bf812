use brc_stats::{aggregate, Config, Strategy};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

const STATIONS: [&str; 8] = [
    "Hamburg", "Bulawayo", "Palembang", "St. John's", "Cracow", "Bridgetown", "Istanbul", "Roseau",
];

fn synthetic(lines: usize) -> Vec<u8> {
    let mut text = String::with_capacity(lines * 16);
    let mut state = 0x2545_f491_u64;
    for _ in 0..lines {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let station = STATIONS[(state >> 33) as usize % STATIONS.len()];
        let tenths = ((state >> 40) % 1999) as i64 - 999;
        text.push_str(&format!("{station};{:.1}\n", tenths as f64 / 10.0));
    }
    text.into_bytes()
}

fn bench_strategies(c: &mut Criterion) {
    let data = synthetic(500_000);
    let mut group = c.benchmark_group("aggregate");
    group.throughput(Throughput::Bytes(data.len() as u64));
    for strategy in [Strategy::Ranges, Strategy::Batched] {
        let config = Config::new().with_strategy(strategy);
        group.bench_function(format!("{strategy:?}"), |b| {
            b.iter(|| aggregate(black_box(&data), &config).map(|run| run.table.len()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_strategies);
criterion_main!(benches);
