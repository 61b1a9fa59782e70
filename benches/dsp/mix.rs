//! Benchmarks for signal mixing operations.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use opgrid::dsp::mix;

use crate::BLOCK_SIZES;

pub fn bench_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/mix");

    for &size in BLOCK_SIZES {
        let signal_a: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();
        let signal_b: Vec<f32> = (0..size).map(|i| (i as f32 * 0.15).cos()).collect();

        // Sum in-place
        let mut buffer_a = signal_a.clone();
        group.bench_with_input(BenchmarkId::new("sum_in_place", size), &size, |b, _| {
            b.iter(|| {
                buffer_a.copy_from_slice(&signal_a);
                mix::sum_in_place(black_box(&mut buffer_a), black_box(&signal_b));
            })
        });

        // Mean of six voices with master gain
        let mut buffer = signal_a.clone();
        group.bench_with_input(BenchmarkId::new("normalize_mean", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&signal_a);
                mix::normalize_mean(black_box(&mut buffer), black_box(6), black_box(0.8));
            })
        });
    }

    group.finish();
}
