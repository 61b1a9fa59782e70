//! Benchmarks for modulation chains of increasing depth.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use opgrid::graph::{ModulationSource, Operator, OperatorGraph, OperatorId, OscillatorParams, RenderCtx};
use opgrid::dsp::Shape;

use crate::{BLOCK_SIZES, SAMPLE_RATE};

/// Carrier at index 0, each operator modulated by the next.
fn chain(depth: usize) -> OperatorGraph {
    let mut graph = OperatorGraph::new();
    let ids: Vec<OperatorId> = (0..depth)
        .map(|k| {
            let mut op = Operator::new(OscillatorParams::new(
                440.0 / (k + 1) as f32,
                1.0,
                Shape::Sine,
            ));
            op.set_modulation_index(2.0);
            graph.add(op)
        })
        .collect();
    for pair in ids.windows(2) {
        graph
            .set_modulator(pair[0], ModulationSource::Operator(pair[1]))
            .expect("chain links are acyclic");
    }
    graph
}

pub fn bench_chains(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/chains");
    let ctx = RenderCtx::new(SAMPLE_RATE);

    for &size in BLOCK_SIZES {
        for depth in [1usize, 2, 6] {
            let mut graph = chain(depth);
            let id = format!("depth_{depth}");
            group.bench_with_input(BenchmarkId::new(id, size), &size, |b, &size| {
                b.iter(|| {
                    graph.begin_block();
                    black_box(graph.render(OperatorId(0), &ctx, size));
                })
            });
        }
    }

    group.finish();
}
