//! Scalar helpers shared by the schedulers.

/// Clamp without the `min <= max` panic of `f32::clamp`.
#[inline]
pub fn clamp(n: f32, min: f32, max: f32) -> f32 {
    n.max(min).min(max)
}

/// Linear interpolation that returns `a` at `t == 0` and `b` at `t == 1` exactly.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

#[inline]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Fraction of `span` covered by `elapsed`, clamped to [0, 1]. Zero-length spans count as done.
#[inline]
pub fn progress(elapsed: f64, span: f64) -> f32 {
    if span <= 0.0 {
        return if elapsed >= 0.0 { 1.0 } else { 0.0 };
    }
    clamp((elapsed / span) as f32, 0.0, 1.0)
}
