//! Signal summing and gain primitives.

/*
Mean Mixing
===========

Voices are combined by summing and then dividing by the number of voices:

    out[i] = gain * (v0[i] + v1[i] + ... + vn[i]) / n

Two full-scale voices summed would peak at 2.0; their mean peaks at 1.0. The
cost is that each voice gets quieter as others join:

    voices   per-voice share
      1          100%
      2           50%
      4           25%

That loudness change per voice count is accepted in exchange for an output
that never exceeds the loudest single voice.

Summation is pointwise, so the order voices are added in does not matter
beyond float rounding.
*/

/// Add signal B into signal A in-place (summing).
///
/// ⚠️ WARNING: Can exceed [-1.0, +1.0] range! Follow with `apply_gain`.
#[inline]
pub fn sum_in_place(a: &mut [f32], b: &[f32]) {
    debug_assert_eq!(a.len(), b.len());

    for (sa, &sb) in a.iter_mut().zip(b.iter()) {
        *sa += sb;
    }
}

/// Multiply every sample by `gain`.
#[inline]
pub fn apply_gain(buf: &mut [f32], gain: f32) {
    if gain == 1.0 {
        return;
    }
    for s in buf.iter_mut() {
        *s *= gain;
    }
}

/// Scale a sum of `count` voices down to their mean, times `gain`.
/// A zero count leaves silence.
#[inline]
pub fn normalize_mean(buf: &mut [f32], count: usize, gain: f32) {
    if count == 0 {
        buf.fill(0.0);
        return;
    }
    apply_gain(buf, gain / count as f32);
}
