#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::f32::consts::TAU;

/*
Waveform Generation
===================

The generator is stateless: it maps a sequence of instantaneous angles to a
sequence of samples. Angles are measured in CYCLES, not radians, so an angle
of 1.25 is a quarter of the way through the second cycle.

    angle (cycles)   0.0   0.25   0.5   0.75   1.0
    sine             0     1      0     -1     0
    square           1     1      -1    -1     1
    sawtooth        -1    -0.5    0     0.5   -1
    triangle        -1     0      1     0     -1

Only the fractional part of an angle matters. Deep phase modulation can push
angles below zero, so the fractional part is taken with `rem_euclid` which
always lands in [0, 1).

Silence
-------

`Shape::Silence` writes zeros. A half-configured operator (one whose shape
was never set, or was set to a name we do not recognise) contributes nothing
to the mix instead of poisoning it.

Volume
------

The generator always produces full-scale output in [-1, +1]. Operators apply
their own volume afterwards.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
    Silence,
}

impl Shape {
    /// Shapes selectable from a control surface, in display order.
    pub const SELECTABLE: [Shape; 4] = [Shape::Sine, Shape::Square, Shape::Sawtooth, Shape::Triangle];

    /// Parse a shape name. Unknown names become `Silence` rather than an error.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "sine" | "sin" => Shape::Sine,
            "square" | "sqr" => Shape::Square,
            "sawtooth" | "saw" => Shape::Sawtooth,
            "triangle" | "triangular" | "tri" => Shape::Triangle,
            other => {
                log::debug!("unknown shape {other:?}, using silence");
                Shape::Silence
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Shape::Sine => "sine",
            Shape::Square => "square",
            Shape::Sawtooth => "sawtooth",
            Shape::Triangle => "triangle",
            Shape::Silence => "silence",
        }
    }

    /// Next selectable shape, wrapping around. `Silence` steps to `Sine`.
    pub fn next(self) -> Self {
        match self {
            Shape::Sine => Shape::Square,
            Shape::Square => Shape::Sawtooth,
            Shape::Sawtooth => Shape::Triangle,
            Shape::Triangle | Shape::Silence => Shape::Sine,
        }
    }

    /// Evaluate one sample at `angle` cycles.
    #[inline]
    pub fn sample(self, angle: f32) -> f32 {
        let frac = angle.rem_euclid(1.0);
        match self {
            Shape::Sine => (TAU * angle).sin(),
            Shape::Square => {
                if frac < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Shape::Sawtooth => 2.0 * frac - 1.0,
            Shape::Triangle => 1.0 - 4.0 * (frac - 0.5).abs(),
            Shape::Silence => 0.0,
        }
    }
}

/// Fill `out` with `shape` evaluated at each angle in `phase`.
///
/// `phase` holds angles in cycles (the argument to `2π·x`). Both slices must
/// have the same length.
#[inline]
pub fn generate(shape: Shape, phase: &[f32], out: &mut [f32]) {
    debug_assert_eq!(phase.len(), out.len());

    if shape == Shape::Silence {
        out.fill(0.0);
        return;
    }

    for (o, &angle) in out.iter_mut().zip(phase.iter()) {
        *o = shape.sample(angle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(shape: Shape, angles: &[f32]) -> Vec<f32> {
        let mut out = vec![f32::NAN; angles.len()];
        generate(shape, angles, &mut out);
        out
    }

    #[test]
    fn sine_matches_reference_points() {
        let out = render(Shape::Sine, &[0.0, 0.25, 0.5, 0.75]);
        let expected = [0.0, 1.0, 0.0, -1.0];
        for (a, e) in out.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "expected {e}, got {a}");
        }
    }

    #[test]
    fn square_switches_at_half_cycle() {
        let out = render(Shape::Square, &[0.0, 0.49, 0.5, 0.99, 1.0]);
        assert_eq!(out, vec![1.0, 1.0, -1.0, -1.0, 1.0]);
    }

    #[test]
    fn sawtooth_ramps_from_minus_one_to_one() {
        let out = render(Shape::Sawtooth, &[0.0, 0.25, 0.5, 0.75]);
        assert_eq!(out, vec![-1.0, -0.5, 0.0, 0.5]);
    }

    #[test]
    fn triangle_is_symmetric() {
        let out = render(Shape::Triangle, &[0.0, 0.25, 0.5, 0.75]);
        assert_eq!(out, vec![-1.0, 0.0, 1.0, 0.0]);

        // Rising and falling halves mirror each other
        let up = Shape::Triangle.sample(0.1);
        let down = Shape::Triangle.sample(0.9);
        assert!((up - down).abs() < 1e-6);
    }

    #[test]
    fn negative_angles_wrap() {
        // -0.25 cycles is the same point as 0.75
        for shape in Shape::SELECTABLE {
            let a = shape.sample(-0.25);
            let b = shape.sample(0.75);
            assert!((a - b).abs() < 1e-5, "{shape:?}: {a} vs {b}");
        }
    }

    #[test]
    fn silence_is_all_zero() {
        let out = render(Shape::Silence, &[0.0, 0.3, 7.9, -2.0]);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn unknown_names_are_silent() {
        assert_eq!(Shape::from_name("tri"), Shape::Triangle);
        assert_eq!(Shape::from_name(" Sine "), Shape::Sine);
        assert_eq!(Shape::from_name("wobble"), Shape::Silence);
        assert_eq!(Shape::from_name(""), Shape::Silence);
    }

    #[test]
    fn output_stays_in_range() {
        let angles: Vec<f32> = (0..1000).map(|i| i as f32 * 0.0137 - 3.0).collect();
        for shape in Shape::SELECTABLE {
            for s in render(shape, &angles) {
                assert!((-1.0..=1.0).contains(&s), "{shape:?} produced {s}");
            }
        }
    }
}
