//! Benchmarks for waveform generation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use opgrid::dsp::{generate, Shape};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_waveform(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/waveform");

    for &size in BLOCK_SIZES {
        let angles: Vec<f32> = (0..size).map(|i| 440.0 * i as f32 / SAMPLE_RATE).collect();
        let mut buffer = vec![0.0f32; size];

        for shape in Shape::SELECTABLE {
            group.bench_with_input(BenchmarkId::new(shape.name(), size), &size, |b, _| {
                b.iter(|| {
                    generate(black_box(shape), black_box(&angles), black_box(&mut buffer));
                })
            });
        }
    }

    group.finish();
}
