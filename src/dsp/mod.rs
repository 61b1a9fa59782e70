//! Low-level DSP primitives used by the operator graph.
//!
//! These components are allocation-free and realtime-safe. They stay focused
//! on the signal math so the graph layer can handle modulation wiring and
//! buffer bookkeeping.

/// Voice summing and mean normalization.
pub mod mix;
/// Per-oscillator running phase with exact buffer-boundary continuation.
pub mod phase;
/// Stateless waveform shapes evaluated over angle sequences.
pub mod waveform;

pub use phase::PhaseAccumulator;
pub use waveform::{generate, Shape};
