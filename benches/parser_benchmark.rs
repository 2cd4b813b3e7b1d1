#![allow(clippy::expect_used, clippy::unwrap_used, missing_docs)]
//! Benchmark for report parsing and series projections.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use smi_viz::telemetry::{parse, Metric, SeriesStore};

const REPORT: &str = "\
+-----------------------------------------------------------------------------+
| NVIDIA-SMI 535.104.05   Driver Version: 535.104.05   CUDA Version: 12.2     |
|-------------------------------+----------------------+----------------------+
| GPU  Name        Persistence-M| Bus-Id        Disp.A | Volatile Uncorr. ECC |
| Fan  Temp  Perf  Pwr:Usage/Cap|         Memory-Usage | GPU-Util  Compute M. |
|===============================+======================+======================|
|   0  NVIDIA GeForce RTX 3070  Off | 00000000:01:00.0  On |                  N/A |
| 30%   65C    P2   120W / 250W |   2048MiB /  8192MiB |     37%      Default |
+-------------------------------+----------------------+----------------------+
";

fn parse_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    group.bench_function("single_device", |b| {
        b.iter(|| parse(black_box(REPORT)).expect("report should parse"));
    });

    // Anchor found after a long process table
    let filler = "| unrelated process row   1234   G   /usr/bin/app   4MiB |\n".repeat(200);
    let padded = format!("{filler}{REPORT}");
    group.bench_function("after_200_rows", |b| {
        b.iter(|| parse(black_box(&padded)).expect("report should parse"));
    });

    group.finish();
}

fn series_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("series");
    let sample = parse(REPORT).expect("report should parse");

    for size in [100, 1_000, 10_000] {
        let mut store = SeriesStore::unbounded();
        for i in 0..size {
            let mut s = sample.clone();
            s.captured_at += chrono::Duration::seconds(i);
            store.append(s).expect("timestamps increase");
        }

        group.bench_with_input(BenchmarkId::new("window_view", size), &size, |b, _| {
            b.iter(|| store.window_view(black_box(None)));
        });
        group.bench_with_input(BenchmarkId::new("rolling_delta", size), &size, |b, _| {
            b.iter(|| store.rolling_delta(Metric::Temperature, black_box(10)));
        });
    }

    group.finish();
}

criterion_group!(benches, parse_benchmark, series_benchmark);
criterion_main!(benches);
