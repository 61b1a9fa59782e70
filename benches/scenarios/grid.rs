//! Benchmarks for full engine blocks over populated grids.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use opgrid::{
    config::{MixMode, PlaybackMode},
    synth::{ControlMessage, SynthEngine},
    EngineConfig,
};

use crate::BLOCK_SIZES;

/// Engine with `rows` voices of `depth` operators each.
fn engine(size: usize, mode: MixMode, rows: usize, depth: usize) -> SynthEngine {
    let config = EngineConfig {
        block_size: size,
        mode,
        playback: PlaybackMode::Continuous,
        ..Default::default()
    };
    let (mut engine, _handle) = SynthEngine::with_channels(&config).expect("bench config is valid");
    for row in 0..rows {
        engine.apply(ControlMessage::SetFrequency(220.0 * (row + 1) as f32));
        for col in 0..depth {
            engine.apply(ControlMessage::Activate { row, col });
        }
    }
    engine
}

pub fn bench_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/grid");

    for &size in BLOCK_SIZES {
        let mut out = vec![0.0f32; size];

        // === SPARSE: one plain carrier ===
        let mut sparse = engine(size, MixMode::Grid, 1, 1);
        group.bench_with_input(BenchmarkId::new("1x1", size), &size, |b, _| {
            b.iter(|| black_box(sparse.render_block(black_box(&mut out))))
        });

        // === FULL: every cell of the default 6x6 grid ===
        let mut full = engine(size, MixMode::Grid, 6, 6);
        group.bench_with_input(BenchmarkId::new("6x6", size), &size, |b, _| {
            b.iter(|| black_box(full.render_block(black_box(&mut out))))
        });

        // === ADDITIVE: six harmonic carriers ===
        let mut additive = engine(
            size,
            MixMode::Additive {
                base_frequency: 110.0,
            },
            6,
            1,
        );
        group.bench_with_input(BenchmarkId::new("additive_6", size), &size, |b, _| {
            b.iter(|| black_box(additive.render_block(black_box(&mut out))))
        });
    }

    group.finish();
}
