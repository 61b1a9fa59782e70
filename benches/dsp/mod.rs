//! Benchmarks for low-level DSP primitives.

mod mix;
mod phase;
mod waveform;

pub use mix::bench_mix;
pub use phase::bench_phase;
pub use waveform::bench_waveform;
