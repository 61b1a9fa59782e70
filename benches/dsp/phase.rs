//! Benchmarks for phase accumulation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use opgrid::dsp::PhaseAccumulator;

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_phase(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/phase");

    for &size in BLOCK_SIZES {
        let mut angles = vec![0.0f32; size];
        let mut phase = PhaseAccumulator::new();

        // Angle vector plus end-of-buffer advance, as one operator does per block
        group.bench_with_input(BenchmarkId::new("fill_and_advance", size), &size, |b, _| {
            b.iter(|| {
                phase.fill_angles(black_box(440.0), SAMPLE_RATE, black_box(&mut angles));
                phase.advance(black_box(440.0), SAMPLE_RATE, size);
            })
        });
    }

    group.finish();
}
