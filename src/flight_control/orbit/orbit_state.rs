use crate::flight_control::guidance_error::InputError;
use std::f64::consts::TAU;

/// Snapshot of an orbit as reported by telemetry.
///
/// Open (hyperbolic) orbits carry a negative semi-major axis and infinite
/// apoapsis radius and period. A snapshot is only valid for the polling cycle
/// it was read in.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrbitState {
    /// Name of the body this orbit is around.
    pub body: String,
    pub apoapsis_radius: f64,
    pub periapsis_radius: f64,
    pub apoapsis_altitude: f64,
    pub periapsis_altitude: f64,
    pub semi_major_axis: f64,
    pub eccentricity: f64,
    pub period: f64,
    pub time_to_apoapsis: f64,
    pub time_to_periapsis: f64,
    /// Time until the vessel leaves the current sphere of influence, if it does.
    pub time_to_soi_change: Option<f64>,
    /// The orbit patch that follows the next sphere-of-influence change.
    pub next_orbit: Option<Box<OrbitState>>,
}

impl OrbitState {
    /// Checks that this is a bound, elliptical orbit with a finite apoapsis.
    pub fn is_closed(&self) -> bool {
        self.eccentricity < 1.0
            && self.semi_major_axis > 0.0
            && self.apoapsis_radius.is_finite()
            && self.period.is_finite()
    }

    /// Checks the apsis ordering `apoapsis_radius >= periapsis_radius >= 0`.
    ///
    /// # Errors
    /// - [`InputError::NonPositiveRadius`] if the apsides are inverted or negative.
    /// - [`InputError::NonFiniteInput`] if the periapsis is not a number.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.periapsis_radius.is_nan() || self.apoapsis_radius.is_nan() {
            return Err(InputError::NonFiniteInput);
        }
        if self.periapsis_radius < 0.0 || self.apoapsis_radius < self.periapsis_radius {
            return Err(InputError::NonPositiveRadius);
        }
        Ok(())
    }

    /// Mean angular velocity along the orbit in rad/s, `None` for open orbits.
    pub fn mean_angular_velocity(&self) -> Option<f64> {
        (self.period.is_finite() && self.period > 0.0).then(|| TAU / self.period)
    }
}

/// Orbit of a body around its parent. Treated as static for planning.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BodyOrbit {
    pub parent: String,
    pub radius: f64,
    pub period: f64,
}

/// Physical properties of a celestial body, immutable for a run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BodyState {
    pub name: String,
    pub gravitational_parameter: f64,
    pub equatorial_radius: f64,
    /// Radius of the sphere of influence, infinite for the root body.
    pub sphere_of_influence: f64,
    pub orbit: Option<BodyOrbit>,
}

impl BodyState {
    /// Radius of the body's own orbit around its parent.
    pub fn orbit_radius(&self) -> Option<f64> { self.orbit.as_ref().map(|o| o.radius) }

    /// Period of the body's own orbit around its parent.
    pub fn orbit_period(&self) -> Option<f64> { self.orbit.as_ref().map(|o| o.period) }

    /// Mean angular velocity of the body around its parent in rad/s.
    pub fn mean_angular_velocity(&self) -> Option<f64> {
        self.orbit_period().filter(|p| p.is_finite() && *p > 0.0).map(|p| TAU / p)
    }

    /// Checks whether this body orbits `parent`.
    pub fn orbits(&self, parent: &str) -> bool {
        self.orbit.as_ref().is_some_and(|o| o.parent == parent)
    }
}

/// Read-only snapshot of the vessel used by a single computation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VehicleState {
    pub mass: f64,
    pub available_thrust: f64,
    pub specific_impulse: f64,
    pub orbit: OrbitState,
}
