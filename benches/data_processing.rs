//! Benchmarks for data processing operations
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serialvis_rs::session::types::format_row;
use serialvis_rs::store::ChannelBufferStore;
use serialvis_rs::types::{parse_line, parse_line_bytes};

fn channel_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("A{}", i)).collect()
}

fn bench_row_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_append");

    for capacity in [1000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("append", capacity),
            capacity,
            |b, &capacity| {
                let store = ChannelBufferStore::new(channel_names(2), capacity);
                let mut i = 0u64;
                b.iter(|| {
                    let v = i as f64;
                    store.append(black_box(&[v, v * 0.5]));
                    i = i.wrapping_add(1);
                });
            },
        );
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for capacity in [1000, 10_000, 50_000].iter() {
        // Pre-fill so the snapshot copies full buffers
        let store = ChannelBufferStore::new(channel_names(4), *capacity);
        for i in 0..*capacity {
            let v = i as f64;
            store.append(&[v, v + 1.0, v + 2.0, v + 3.0]);
        }

        group.throughput(Throughput::Elements(*capacity as u64 * 4));
        group.bench_with_input(BenchmarkId::new("snapshot", capacity), &store, |b, store| {
            b.iter(|| black_box(store.snapshot()));
        });
    }

    group.finish();
}

fn bench_line_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_parsing");

    for channels in [2usize, 8, 32].iter() {
        let values: Vec<f64> = (0..*channels).map(|i| i as f64 * 1.25).collect();
        let line = format!("{}\r\n", format_row(&values));

        group.throughput(Throughput::Bytes(line.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse_line", channels), &line, |b, line| {
            b.iter(|| black_box(parse_line(black_box(line), *channels)));
        });
        group.bench_with_input(
            BenchmarkId::new("parse_line_bytes", channels),
            &line,
            |b, line| {
                b.iter(|| black_box(parse_line_bytes(black_box(line.as_bytes()), *channels)));
            },
        );
    }

    group.bench_function("reject_invalid_field", |b| {
        b.iter(|| black_box(parse_line(black_box("1.0,abc"), 2)));
    });

    group.finish();
}

criterion_group!(benches, bench_row_append, bench_snapshot, bench_line_parsing);
criterion_main!(benches);
