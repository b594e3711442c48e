use std::f64::consts::{PI, TAU};

/// Maps an arbitrary angle (radians) into the half-open interval `(-π, π]`.
///
/// Angles already inside the interval are returned unchanged, so the mapping
/// is idempotent. Non-finite input yields `NaN`.
///
/// # Arguments
/// - `angle`: The angle in radians.
///
/// # Returns
/// - The equivalent angle in `(-π, π]`.
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return f64::NAN;
    }
    if angle > -PI && angle <= PI {
        return angle;
    }
    let mut rem = (PI - angle).rem_euclid(TAU);
    if rem >= TAU {
        rem = 0.0;
    }
    PI - rem
}

/// Advances `angle` by whole turns until it lies strictly ahead of `reference`.
///
/// Turns are only ever added, never subtracted, so the result is the first
/// equivalent angle that has not been passed yet.
///
/// # Returns
/// - `Some(angle)` with `angle > reference`.
/// - `None` if either input is not finite.
pub fn advance_past(angle: f64, reference: f64) -> Option<f64> {
    if !angle.is_finite() || !reference.is_finite() {
        return None;
    }
    let mut advanced = angle;
    if advanced <= reference {
        advanced += ((reference - advanced) / TAU).floor() * TAU;
    }
    while advanced <= reference {
        advanced += TAU;
    }
    Some(advanced)
}

/// Linearly interpolates a value `t` between two points `(x1, y1)` and `(x2, y2)`.
///
/// `t` is clamped to `[x1, x2]`, the result never extrapolates past either end.
pub fn interpolate(x1: f64, x2: f64, y1: f64, y2: f64, t: f64) -> f64 {
    let r_t = t.clamp(x1, x2);
    y1 + (r_t - x1) * (y2 - y1) / (x2 - x1)
}
