pub mod config; // Engine configuration
pub mod dsp; // Waveforms, phase accumulation, mixing kernels
pub mod error;
pub mod graph; // Operators and the operator matrix
pub mod io; // Audio output, keyboard layout
pub mod synth; // Realtime engine and control messages

pub use config::EngineConfig;
pub use error::Error;

pub const SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_BLOCK_SIZE: usize = 1024;
pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_FREQUENCY: f32 = 0.01;
