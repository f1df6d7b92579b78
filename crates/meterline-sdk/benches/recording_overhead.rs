//! Benchmark recording overhead
//!
//! Measures what the instrument path adds on top of the bare loop, for
//! counters and measures, on a single thread and under contention.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use meterline_api::{LabelSet, Meter, MeterProvider};
use meterline_sdk::MeterProviderSdk;
use std::hint::black_box;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Loop without recording
fn baseline(iterations: u64) -> Duration {
    let start = Instant::now();

    for i in 0..iterations {
        black_box(i % 1_000);
    }

    start.elapsed()
}

/// Counter add per iteration, alternating between two label sets
fn counter_adds(iterations: u64, meter: &Arc<dyn Meter>, labels: &[LabelSet; 2]) -> Duration {
    let counter = meter.create_i64_counter("bench_counter", true);
    let start = Instant::now();

    for i in 0..iterations {
        counter.add(black_box((i % 1_000) as i64), &labels[(i % 2) as usize]);
    }

    start.elapsed()
}

/// Measure record per iteration through a bound handle
fn bound_measure_records(iterations: u64, meter: &Arc<dyn Meter>, labels: &LabelSet) -> Duration {
    let measure = meter.create_f64_measure("bench_measure", true).bind(labels);
    let start = Instant::now();

    for i in 0..iterations {
        measure.record(black_box((i % 100) as f64 / 1000.0));
    }

    start.elapsed()
}

fn bench_counter_overhead(c: &mut Criterion) {
    let provider = MeterProviderSdk::new().unwrap();
    let meter = provider.meter("bench");
    let labels = [
        meter.get_label_set(&[("dim1", "value1"), ("dim2", "value1")]),
        meter.get_label_set(&[("dim1", "value2"), ("dim2", "value2")]),
    ];
    let mut group = c.benchmark_group("counter_overhead");

    for iterations in [1_000, 10_000, 100_000] {
        group.bench_with_input(
            BenchmarkId::new("baseline", iterations),
            &iterations,
            |b, &iterations| {
                b.iter(|| baseline(iterations));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("with_counter", iterations),
            &iterations,
            |b, &iterations| {
                b.iter(|| counter_adds(iterations, &meter, &labels));
            },
        );
    }

    group.finish();
}

fn bench_measure_overhead(c: &mut Criterion) {
    let provider = MeterProviderSdk::new().unwrap();
    let meter = provider.meter("bench");
    let labels = meter.get_label_set(&[("route", "/checkout")]);
    let mut group = c.benchmark_group("measure_overhead");

    for iterations in [1_000, 10_000, 100_000] {
        group.bench_with_input(
            BenchmarkId::new("baseline", iterations),
            &iterations,
            |b, &iterations| {
                b.iter(|| baseline(iterations));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("with_bound_measure", iterations),
            &iterations,
            |b, &iterations| {
                b.iter(|| bound_measure_records(iterations, &meter, &labels));
            },
        );
    }

    group.finish();
}

fn bench_contended_counter(c: &mut Criterion) {
    let provider = Arc::new(MeterProviderSdk::new().unwrap());
    let labels = LabelSet::new([("shard", "0")]);

    c.bench_function("contended_counter_4x25k", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let counter = provider.meter("bench").create_i64_counter("contended", true);
                    let labels = labels.clone();
                    std::thread::spawn(move || {
                        for i in 0..25_000 {
                            counter.add(i % 3, &labels);
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
            black_box(provider.collect());
        });
    });
}

criterion_group!(
    benches,
    bench_counter_overhead,
    bench_measure_overhead,
    bench_contended_counter
);
criterion_main!(benches);
