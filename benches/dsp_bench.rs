//! Benchmarks for DSP primitives and real-world scenarios.
//!
//! Run with: cargo bench
//!
//! Each buffer must render well inside its playback time.
//!
//! Reference timing at 44.1kHz sample rate:
//!   - 256 samples  = 5.80ms deadline
//!   - 512 samples  = 11.61ms deadline
//!   - 1024 samples = 23.22ms deadline
//!   - 2048 samples = 46.44ms deadline
//!
//! Benchmark groups:
//!   - dsp/*        Waveform generation, phase accumulation, mixing kernels
//!   - scenarios/*  Modulation chains and full operator grids

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Buffer sizes the engine accepts, up to `MAX_BLOCK_SIZE`.
pub const BLOCK_SIZES: &[usize] = &[256, 512, 1024, 2048];

pub const SAMPLE_RATE: f32 = 44_100.0;

criterion_group!(
    benches,
    // Low-level DSP primitives
    dsp::bench_waveform,
    dsp::bench_phase,
    dsp::bench_mix,
    // Real-world scenarios
    scenarios::bench_chains,
    scenarios::bench_grid,
);
criterion_main!(benches);
