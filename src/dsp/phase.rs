/*
Phase Accumulator
=================

Each oscillator carries its own running phase, measured in cycles and kept in
[0, 1). A buffer of N samples at sample rate R covers exactly N/R seconds:

    t[i] = i / R              for i in 0..N   (0 included, N/R excluded)
    angle[i] = f * t[i] + p

After the buffer the phase moves on by f * N / R cycles:

    p' = frac(p + f * N / R)

so the first angle of the next buffer is exactly one sample step past the
last angle of this one. An inclusive time vector (N points spanning N/R)
would stretch every buffer by one sample interval and repeat the boundary
sample, which is audible as a click at the buffer rate.

The accumulator runs in f64. Angles handed to the waveform generator are
f32, which is plenty for a single buffer's span, but repeated f32 wrapping
over minutes of playback drifts.
*/

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseAccumulator {
    phase: f64,
}

impl PhaseAccumulator {
    pub fn new() -> Self {
        Self { phase: 0.0 }
    }

    #[inline]
    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Fill `out` with angles (in cycles) for one buffer at `frequency` Hz,
    /// starting from the current phase. Does not advance.
    #[inline]
    pub fn fill_angles(&self, frequency: f32, sample_rate: f32, out: &mut [f32]) {
        let step = frequency as f64 / sample_rate as f64;
        for (i, angle) in out.iter_mut().enumerate() {
            *angle = (step * i as f64 + self.phase) as f32;
        }
    }

    /// Advance past a buffer of `len` samples at `frequency` Hz.
    #[inline]
    pub fn advance(&mut self, frequency: f32, sample_rate: f32, len: usize) {
        let cycles = frequency as f64 * len as f64 / sample_rate as f64;
        self.phase = (self.phase + cycles).rem_euclid(1.0);
        // rem_euclid can round up to exactly 1.0 for tiny negative inputs
        if self.phase >= 1.0 {
            self.phase = 0.0;
        }
    }
}
