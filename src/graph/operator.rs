use std::{f32::consts::TAU, fmt};

use crate::{
    dsp::{generate, PhaseAccumulator, Shape},
    error::Error,
    MAX_BLOCK_SIZE,
};

/*
Operators and Phase Modulation
==============================

An operator is an oscillator that can have its phase pushed around by
another operator's output. The pushing operator is the MODULATOR, the pushed
one the CARRIER, and the amount of pushing the MODULATION INDEX.

    angle[i] = f * t[i] + p                      (plain oscillator, cycles)
    angle[i] = f * t[i] + p + index * m[i] / 2π  (modulated, cycles)

Written in radians the modulated case is the textbook form:

    out[i] = volume * wave(2π (f t[i] + p) + index * m[i])

where m[i] is the modulator's finished output sample (volume applied). This
is phase modulation: the modulator's sample is added straight to the
carrier's phase, it is not integrated into the frequency first.

Chains
------

A modulator may itself be modulated, giving chains like

    op C ──▶ op B ──▶ op A ──▶ mix
    (deepest)         (carrier)

Rendering is bottom-up: A asks for B's buffer, B asks for C's buffer, C
renders plainly, B renders against C, A renders against B.

Render Epochs
-------------

Each operator advances its phase once per rendered buffer. If one modulator
feeds two carriers, naively rendering it twice would advance it twice and
knock it out of step. The graph therefore keeps a render EPOCH: `begin_block`
starts a new one, and an operator already rendered in the current epoch
hands back its cached buffer.

    epoch 7:  A → B (renders B, caches)     A' → B (cached, no advance)

Cycles
------

A loop (A modulates B modulates A) has no bottom to render from. Links are
only ever set through `OperatorGraph::set_modulator`, which walks the
proposed modulator's own chain and refuses the link if it leads back to the
carrier.
*/

/// Handle to an operator inside an `OperatorGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperatorId(pub usize);

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What perturbs an operator's phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModulationSource {
    #[default]
    None,
    Operator(OperatorId),
}

/// Volume in `[0, 1]`. Non-finite input is silence.
#[inline]
pub(crate) fn sanitize_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Frequency at least `MIN_FREQUENCY`. Non-finite input falls to the floor.
#[inline]
pub(crate) fn sanitize_frequency(frequency: f32) -> f32 {
    if frequency.is_finite() {
        frequency.max(crate::MIN_FREQUENCY)
    } else {
        crate::MIN_FREQUENCY
    }
}

/// Modulation index, non-negative and finite.
#[inline]
pub(crate) fn sanitize_index(index: f32) -> f32 {
    if index.is_finite() {
        index.max(0.0)
    } else {
        0.0
    }
}

/// Snapshot of the oscillator controls an operator plays with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorParams {
    pub frequency: f32,
    pub volume: f32,
    pub shape: Shape,
}

impl OscillatorParams {
    pub const SILENT: Self = Self {
        frequency: crate::MIN_FREQUENCY,
        volume: 0.0,
        shape: Shape::Silence,
    };

    pub fn new(frequency: f32, volume: f32, shape: Shape) -> Self {
        Self {
            frequency: sanitize_frequency(frequency),
            volume: sanitize_volume(volume),
            shape,
        }
    }
}

impl Default for OscillatorParams {
    fn default() -> Self {
        Self::SILENT
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Operator {
    params: OscillatorParams,
    modulation_index: f32,
    modulator: ModulationSource,
    phase: PhaseAccumulator,
}

impl Operator {
    pub fn new(params: OscillatorParams) -> Self {
        Self {
            params,
            modulation_index: 0.0,
            modulator: ModulationSource::None,
            phase: PhaseAccumulator::new(),
        }
    }

    pub fn silent() -> Self {
        Self::new(OscillatorParams::SILENT)
    }

    pub fn params(&self) -> OscillatorParams {
        self.params
    }

    pub fn frequency(&self) -> f32 {
        self.params.frequency
    }

    pub fn volume(&self) -> f32 {
        self.params.volume
    }

    pub fn shape(&self) -> Shape {
        self.params.shape
    }

    pub fn modulation_index(&self) -> f32 {
        self.modulation_index
    }

    pub fn modulator(&self) -> ModulationSource {
        self.modulator
    }

    pub fn phase(&self) -> f64 {
        self.phase.phase()
    }

    /// Replace the oscillator controls. Phase is left alone.
    pub fn set_params(&mut self, params: OscillatorParams) {
        self.params = OscillatorParams::new(params.frequency, params.volume, params.shape);
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.params.frequency = sanitize_frequency(frequency);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.params.volume = sanitize_volume(volume);
    }

    pub fn set_shape(&mut self, shape: Shape) {
        self.params.shape = shape;
    }

    pub fn set_modulation_index(&mut self, index: f32) {
        self.modulation_index = sanitize_index(index);
    }

    pub fn reset_phase(&mut self) {
        self.phase.reset();
    }
}

/// Context passed to operators during rendering
pub struct RenderCtx {
    pub sample_rate: f32,
}

impl RenderCtx {
    pub fn new(sample_rate: f32) -> Self {
        Self { sample_rate }
    }
}

/// Arena of operators with memoized, once-per-buffer evaluation.
pub struct OperatorGraph {
    operators: Vec<Operator>,
    buffers: Vec<Vec<f32>>,
    rendered_in: Vec<u64>,
    angles: Vec<f32>,
    epoch: u64,
}

impl OperatorGraph {
    pub fn new() -> Self {
        Self {
            operators: Vec::new(),
            buffers: Vec::new(),
            rendered_in: Vec::new(),
            angles: vec![0.0; MAX_BLOCK_SIZE],
            epoch: 1,
        }
    }

    /// Create a graph of `count` silent, unlinked operators.
    pub fn with_operators(count: usize) -> Self {
        let mut graph = Self::new();
        for _ in 0..count {
            graph.add(Operator::silent());
        }
        graph
    }

    /// Add an operator. Allocates its render buffer, so call this outside
    /// the audio thread.
    pub fn add(&mut self, operator: Operator) -> OperatorId {
        let id = OperatorId(self.operators.len());
        self.operators.push(operator);
        self.buffers.push(vec![0.0; MAX_BLOCK_SIZE]);
        self.rendered_in.push(0);
        id
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn contains(&self, id: OperatorId) -> bool {
        id.0 < self.operators.len()
    }

    pub fn get(&self, id: OperatorId) -> Option<&Operator> {
        self.operators.get(id.0)
    }

    /// Mutable access to an operator's controls. The modulator link is not
    /// reachable from here; use `set_modulator`.
    pub fn get_mut(&mut self, id: OperatorId) -> Option<&mut Operator> {
        self.operators.get_mut(id.0)
    }

    /// Link `source` as the modulator of `carrier`.
    ///
    /// Rejects self-modulation and any link that would let `carrier`
    /// transitively modulate itself. On error the graph is unchanged.
    pub fn set_modulator(&mut self, carrier: OperatorId, source: ModulationSource) -> Result<(), Error> {
        if !self.contains(carrier) {
            return Err(Error::UnknownOperator(carrier));
        }

        if let ModulationSource::Operator(modulator) = source {
            if !self.contains(modulator) {
                return Err(Error::UnknownOperator(modulator));
            }
            if self.reaches(modulator, carrier) {
                return Err(Error::ModulationCycle {
                    carrier,
                    source: modulator,
                });
            }
        }

        self.operators[carrier.0].modulator = source;
        Ok(())
    }

    /// Put `id` back to a silent, unlinked operator with zero phase.
    pub fn reset(&mut self, id: OperatorId) {
        if let Some(op) = self.operators.get_mut(id.0) {
            *op = Operator::silent();
        }
    }

    /// Turn `carrier` back into a plain oscillator.
    pub fn clear_modulator(&mut self, carrier: OperatorId) {
        if let Some(op) = self.operators.get_mut(carrier.0) {
            op.modulator = ModulationSource::None;
        }
    }

    /// Does following modulator links from `from` arrive at `target`?
    /// `from == target` counts.
    fn reaches(&self, from: OperatorId, target: OperatorId) -> bool {
        let mut current = from;
        // Links are acyclic, so a walk never needs more steps than operators
        for _ in 0..=self.operators.len() {
            if current == target {
                return true;
            }
            match self.operators[current.0].modulator {
                ModulationSource::Operator(next) => current = next,
                ModulationSource::None => return false,
            }
        }
        true
    }

    /// Operators modulating `id`, nearest first.
    pub fn modulator_chain(&self, id: OperatorId) -> Vec<OperatorId> {
        let mut chain = Vec::new();
        let mut current = self.get(id).map(|op| op.modulator);
        while let Some(ModulationSource::Operator(next)) = current {
            chain.push(next);
            current = self.get(next).map(|op| op.modulator);
        }
        chain
    }

    /// Start a new buffer period. Operators rendered after this call advance
    /// their phase once more.
    pub fn begin_block(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Render `id` for the current buffer period and return its samples.
    ///
    /// Modulators are rendered first. Within one period each operator is
    /// evaluated at most once; later requests return the cached buffer.
    pub fn render(&mut self, id: OperatorId, ctx: &RenderCtx, len: usize) -> &[f32] {
        debug_assert!(len <= MAX_BLOCK_SIZE);
        let len = len.min(MAX_BLOCK_SIZE);

        if self.contains(id) {
            self.evaluate(id, ctx, len);
            &self.buffers[id.0][..len]
        } else {
            &[]
        }
    }

    fn evaluate(&mut self, id: OperatorId, ctx: &RenderCtx, len: usize) {
        if self.rendered_in[id.0] == self.epoch {
            return;
        }

        let op = self.operators[id.0];
        let OscillatorParams {
            frequency,
            volume,
            shape,
        } = op.params;

        if let ModulationSource::Operator(modulator) = op.modulator {
            self.evaluate(modulator, ctx, len);
        }

        let mut angles = std::mem::take(&mut self.angles);
        let mut out = std::mem::take(&mut self.buffers[id.0]);
        {
            let angles = &mut angles[..len];
            op.phase.fill_angles(frequency, ctx.sample_rate, angles);

            if let ModulationSource::Operator(modulator) = op.modulator {
                // Index is in radians; angles are in cycles
                let depth = op.modulation_index / TAU;
                for (a, &m) in angles.iter_mut().zip(&self.buffers[modulator.0][..len]) {
                    *a += depth * m;
                }
            }

            let out = &mut out[..len];
            generate(shape, angles, out);
            if volume != 1.0 {
                for s in out.iter_mut() {
                    *s *= volume;
                }
            }
        }
        self.buffers[id.0] = out;
        self.angles = angles;

        self.operators[id.0]
            .phase
            .advance(frequency, ctx.sample_rate, len);
        self.rendered_in[id.0] = self.epoch;
    }
}

impl Default for OperatorGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: f32 = 44_100.0;
    const CHUNK: usize = 1024;

    fn sine(frequency: f32) -> Operator {
        Operator::new(OscillatorParams::new(frequency, 1.0, Shape::Sine))
    }

    #[test]
    fn plain_sine_concrete_case() {
        let mut graph = OperatorGraph::new();
        let a = graph.add(sine(440.0));
        let ctx = RenderCtx::new(RATE);

        graph.begin_block();
        let out = graph.render(a, &ctx, CHUNK);

        assert_eq!(out.len(), CHUNK);
        assert_eq!(out[0], 0.0);
        let expected = (TAU * 440.0 * (CHUNK - 1) as f32 / RATE).sin();
        assert!((out[CHUNK - 1] - expected).abs() < 1e-4, "expected {expected}, got {}", out[CHUNK - 1]);
    }

    #[test]
    fn phase_modulation_concrete_case() {
        let mut graph = OperatorGraph::new();
        let carrier = graph.add(sine(440.0));
        let modulator = graph.add(sine(5.0));
        graph
            .set_modulator(carrier, ModulationSource::Operator(modulator))
            .unwrap();
        graph.get_mut(carrier).unwrap().set_modulation_index(2.0);

        let ctx = RenderCtx::new(RATE);
        graph.begin_block();
        let out = graph.render(carrier, &ctx, CHUNK).to_vec();

        for (i, &sample) in out.iter().enumerate() {
            let t = i as f64 / RATE as f64;
            let expected = (std::f64::consts::TAU * 440.0 * t
                + 2.0 * (std::f64::consts::TAU * 5.0 * t).sin())
            .sin() as f32;
            assert!((sample - expected).abs() < 1e-3, "sample {i}: expected {expected}, got {sample}");
        }
    }

    #[test]
    fn volume_scales_output() {
        let mut graph = OperatorGraph::new();
        let a = graph.add(Operator::new(OscillatorParams::new(440.0, 0.25, Shape::Square)));
        let ctx = RenderCtx::new(RATE);

        graph.begin_block();
        let out = graph.render(a, &ctx, 64);
        assert!(out.iter().all(|&s| (s.abs() - 0.25).abs() < 1e-6));
    }

    #[test]
    fn phase_persists_across_buffers() {
        let mut graph = OperatorGraph::new();
        let a = graph.add(sine(440.0));
        let ctx = RenderCtx::new(RATE);

        graph.begin_block();
        graph.render(a, &ctx, CHUNK);
        graph.begin_block();
        let second = graph.render(a, &ctx, CHUNK).to_vec();

        // Second buffer continues at sample index CHUNK of one long sine
        for (i, &sample) in second.iter().enumerate().step_by(97) {
            let n = (CHUNK + i) as f64;
            let expected = (std::f64::consts::TAU * 440.0 * n / RATE as f64).sin() as f32;
            assert!((sample - expected).abs() < 1e-3, "sample {i}: expected {expected}, got {sample}");
        }
    }

    #[test]
    fn repeated_render_in_one_block_is_cached() {
        let mut graph = OperatorGraph::new();
        let a = graph.add(sine(440.0));
        let ctx = RenderCtx::new(RATE);

        graph.begin_block();
        let first = graph.render(a, &ctx, CHUNK).to_vec();
        let phase = graph.get(a).unwrap().phase();
        let again = graph.render(a, &ctx, CHUNK).to_vec();

        assert_eq!(first, again);
        assert_eq!(graph.get(a).unwrap().phase(), phase);
    }

    #[test]
    fn fan_out_modulator_advances_once() {
        let mut graph = OperatorGraph::new();
        let left = graph.add(sine(220.0));
        let right = graph.add(sine(330.0));
        let shared = graph.add(sine(7.0));
        graph
            .set_modulator(left, ModulationSource::Operator(shared))
            .unwrap();
        graph
            .set_modulator(right, ModulationSource::Operator(shared))
            .unwrap();

        let ctx = RenderCtx::new(RATE);
        for _ in 0..3 {
            graph.begin_block();
            graph.render(left, &ctx, CHUNK);
            graph.render(right, &ctx, CHUNK);
        }

        let expected = (7.0 * 3.0 * CHUNK as f64 / RATE as f64).fract();
        let phase = graph.get(shared).unwrap().phase();
        assert!((phase - expected).abs() < 1e-9, "phase {phase}, expected {expected}");
    }

    #[test]
    fn rejects_self_modulation() {
        let mut graph = OperatorGraph::with_operators(1);
        let a = OperatorId(0);
        let err = graph.set_modulator(a, ModulationSource::Operator(a));
        assert!(matches!(err, Err(Error::ModulationCycle { .. })));
        assert_eq!(graph.get(a).unwrap().modulator(), ModulationSource::None);
    }

    #[test]
    fn rejects_transitive_cycle() {
        let mut graph = OperatorGraph::with_operators(3);
        let (a, b, c) = (OperatorId(0), OperatorId(1), OperatorId(2));
        graph.set_modulator(a, ModulationSource::Operator(b)).unwrap();
        graph.set_modulator(b, ModulationSource::Operator(c)).unwrap();

        let err = graph.set_modulator(c, ModulationSource::Operator(a));
        assert!(matches!(
            err,
            Err(Error::ModulationCycle { carrier, source }) if carrier == c && source == a
        ));
        assert_eq!(graph.modulator_chain(a), vec![b, c]);
        assert!(graph.modulator_chain(c).is_empty());
    }

    #[test]
    fn rejects_unknown_handles() {
        let mut graph = OperatorGraph::with_operators(1);
        let err = graph.set_modulator(OperatorId(0), ModulationSource::Operator(OperatorId(9)));
        assert!(matches!(err, Err(Error::UnknownOperator(OperatorId(9)))));
    }

    #[test]
    fn non_finite_controls_are_sanitized() {
        let mut op = Operator::new(OscillatorParams::new(f32::INFINITY, f32::NAN, Shape::Sine));
        assert_eq!(op.frequency(), crate::MIN_FREQUENCY);
        assert_eq!(op.volume(), 0.0);

        op.set_volume(f32::NAN);
        op.set_frequency(f32::NAN);
        op.set_modulation_index(f32::INFINITY);
        assert_eq!(op.volume(), 0.0);
        assert_eq!(op.frequency(), crate::MIN_FREQUENCY);
        assert_eq!(op.modulation_index(), 0.0);
    }

    #[test]
    fn silent_operator_renders_zeros() {
        let mut graph = OperatorGraph::with_operators(1);
        let ctx = RenderCtx::new(RATE);
        graph.begin_block();
        assert!(graph.render(OperatorId(0), &ctx, 256).iter().all(|&s| s == 0.0));
    }
}
