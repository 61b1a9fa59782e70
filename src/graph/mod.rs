//! The phase-modulation graph: operators linked into chains, laid out in a
//! fixed grid of voices.
//!
//! Operators live in an arena and refer to their modulator by handle.
//! Rendering is memoized per buffer period so shared modulators advance once.

/// Activation state machine over a rows × cols operator grid.
pub mod matrix;
/// Operators, modulation links and memoized rendering.
pub mod operator;

pub use matrix::{CellChange, CellState, ControlValues, OperatorMatrix};
pub use operator::{
    ModulationSource, Operator, OperatorGraph, OperatorId, OscillatorParams, RenderCtx,
};
