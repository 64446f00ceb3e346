//! Angle normalization.

use std::f32::consts::PI;

/// Normalize angle to [-π, π].
///
/// # Example
/// ```
/// use shodhana::core::math::normalize_angle;
/// use std::f32::consts::PI;
///
/// assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-6);
/// assert!((normalize_angle(-3.0 * PI) - (-PI)).abs() < 1e-6);
/// ```
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}
