//! Real-world scenario benchmarks.
//!
//! These model how the operator grid is actually played: single deep
//! modulation chains and fully populated grids mixed down.

mod chains;
mod grid;

pub use chains::bench_chains;
pub use grid::bench_grid;
