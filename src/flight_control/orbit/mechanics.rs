use crate::flight_control::guidance_error::InputError;
use std::f64::consts::PI;

/// Standard gravity used to convert specific impulse into exhaust velocity.
pub const STANDARD_GRAVITY: f64 = 9.82;

/// Mass flow rates below this are treated as "no flow", the burn would never end.
const MIN_FLOW_RATE: f64 = 1e-9;

/// Orbital speed at radius `r` on an orbit with semi-major axis `sma` (vis-viva).
///
/// ```text
/// v = sqrt(mu * (2/r - 1/a))
/// ```
///
/// # Errors
/// - [`InputError::NonPositiveRadius`] if `r <= 0`.
/// - [`InputError::NonPositiveMu`] if `mu <= 0`.
/// - [`InputError::NonFiniteInput`] for non-finite inputs or a zero semi-major axis.
/// - [`InputError::NegativeRadicand`] if `r` is not reachable on the orbit.
pub fn vis_viva_speed(r: f64, sma: f64, mu: f64) -> Result<f64, InputError> {
    if !r.is_finite() || !sma.is_finite() || !mu.is_finite() || sma == 0.0 {
        return Err(InputError::NonFiniteInput);
    }
    if r <= 0.0 {
        return Err(InputError::NonPositiveRadius);
    }
    if mu <= 0.0 {
        return Err(InputError::NonPositiveMu);
    }
    let radicand = mu * (2.0 / r - 1.0 / sma);
    if radicand < 0.0 {
        return Err(InputError::NegativeRadicand);
    }
    Ok(radicand.sqrt())
}

/// Velocity change needed at `target_radius` to move from an orbit with
/// semi-major axis `from_sma` onto one with `to_sma`.
///
/// A positive result is a prograde burn, a negative one retrograde. The result
/// is antisymmetric in the two semi-major axes.
///
/// # Errors
/// See [`vis_viva_speed`], a negative radicand on either orbit is fatal.
pub fn delta_v(target_radius: f64, from_sma: f64, to_sma: f64, mu: f64) -> Result<f64, InputError> {
    let v_from = vis_viva_speed(target_radius, from_sma, mu)?;
    let v_to = vis_viva_speed(target_radius, to_sma, mu)?;
    Ok(v_to - v_from)
}

/// Burn time for a velocity change using the rocket equation.
///
/// Only the magnitude of `delta_v` matters, retrograde burns take as long as
/// prograde ones of the same size. For fixed thrust, specific impulse and mass
/// the result is strictly increasing in `|delta_v|`.
///
/// ```text
/// v_e  = isp * g0
/// m_1  = m_0 / exp(dv / v_e)
/// t    = (m_0 - m_1) / (F / v_e)
/// ```
///
/// # Errors
/// - [`InputError::InsufficientThrust`] if thrust or specific impulse are not positive,
///   or the resulting flow rate vanishes.
/// - [`InputError::NonPositiveMass`] if `mass <= 0`.
/// - [`InputError::NonFiniteInput`] for non-finite inputs.
pub fn burn_duration(
    delta_v: f64,
    thrust: f64,
    specific_impulse: f64,
    mass: f64,
) -> Result<f64, InputError> {
    if !delta_v.is_finite() || !thrust.is_finite() || !specific_impulse.is_finite() || !mass.is_finite() {
        return Err(InputError::NonFiniteInput);
    }
    if thrust <= 0.0 || specific_impulse <= 0.0 {
        return Err(InputError::InsufficientThrust);
    }
    if mass <= 0.0 {
        return Err(InputError::NonPositiveMass);
    }
    let exhaust_velocity = specific_impulse * STANDARD_GRAVITY;
    let final_mass = mass / (delta_v.abs() / exhaust_velocity).exp();
    let flow_rate = thrust / exhaust_velocity;
    if flow_rate < MIN_FLOW_RATE {
        return Err(InputError::InsufficientThrust);
    }
    let duration = (mass - final_mass) / flow_rate;
    if duration.is_finite() { Ok(duration) } else { Err(InputError::InsufficientThrust) }
}

/// Half the period of an elliptical orbit with semi-major axis `sma`, the
/// time of flight of a Hohmann transfer along it.
///
/// # Errors
/// - [`InputError::NonPositiveRadius`] if `sma <= 0` (no elliptical transfer).
/// - [`InputError::NonPositiveMu`] if `mu <= 0`.
pub fn half_period(sma: f64, mu: f64) -> Result<f64, InputError> {
    if !sma.is_finite() || !mu.is_finite() {
        return Err(InputError::NonFiniteInput);
    }
    if sma <= 0.0 {
        return Err(InputError::NonPositiveRadius);
    }
    if mu <= 0.0 {
        return Err(InputError::NonPositiveMu);
    }
    Ok(PI * (sma.powi(3) / mu).sqrt())
}
