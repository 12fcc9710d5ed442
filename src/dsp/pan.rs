//! Constant-power pan law.

/// Left/right gains for a bipolar pan in `[-1, 1]`.
///
/// `left² + right² == 1` across the whole range; centre gives `sqrt(0.5)` on both sides.
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let pan = pan.clamp(-1.0, 1.0);
    let left = (0.5 * (1.0 - pan)).sqrt();
    let right = (0.5 * (1.0 + pan)).sqrt();
    (left, right)
}
