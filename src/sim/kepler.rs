use crate::flight_control::{
    common::Vec3D,
    orbit::{BodyState, OrbitState},
};
use std::f64::consts::{PI, TAU};

/// Eccentricities below this are treated as circular.
const CIRCULAR_ECCENTRICITY: f64 = 1e-9;
/// Minimum distance of the eccentricity from the parabolic `e = 1`.
const PARABOLIC_BAND: f64 = 1e-9;

/// Computes the osculating orbit of a state vector relative to `body`.
///
/// `pos` and `vel` are given in the body's non-rotating frame. Closed orbits
/// report finite apoapsis and period, open orbits an infinite apoapsis and
/// period and a negative semi-major axis.
pub fn orbit_from_state(pos: Vec3D<f64>, vel: Vec3D<f64>, body: &BodyState) -> OrbitState {
    let mu = body.gravitational_parameter;
    let r = pos.abs();
    let v = vel.abs();

    let energy = v * v / 2.0 - mu / r;
    let h = pos.cross(vel);
    let e_vec = vel.cross(h) / mu - pos / r;
    // radial and near-parabolic trajectories follow the sign of the energy
    let bound = energy < 0.0;
    let mut ecc = e_vec.abs();
    if bound && ecc >= 1.0 - PARABOLIC_BAND {
        ecc = 1.0 - PARABOLIC_BAND;
    } else if !bound && ecc <= 1.0 + PARABOLIC_BAND {
        ecc = 1.0 + PARABOLIC_BAND;
    }
    let p = h.dot(h) / mu;
    let periapsis_radius = p / (1.0 + ecc);
    let semi_major_axis = if energy.abs() > f64::EPSILON { -mu / (2.0 * energy) } else { f64::INFINITY };

    let true_anomaly = if ecc < CIRCULAR_ECCENTRICITY {
        0.0
    } else {
        let cos_nu = (e_vec.dot(pos) / (ecc * r)).clamp(-1.0, 1.0);
        if pos.dot(vel) >= 0.0 { cos_nu.acos() } else { TAU - cos_nu.acos() }
    };

    let (apoapsis_radius, period, time_to_periapsis, time_to_apoapsis) = if ecc < 1.0 {
        let a = semi_major_axis;
        let n = (mu / a.powi(3)).sqrt();
        let ecc_anomaly = 2.0 * (((1.0 - ecc) / (1.0 + ecc)).sqrt() * (true_anomaly / 2.0).tan()).atan();
        let mean_anomaly = (ecc_anomaly - ecc * ecc_anomaly.sin()).rem_euclid(TAU);
        (
            a * (1.0 + ecc),
            TAU / n,
            (TAU - mean_anomaly).rem_euclid(TAU) / n,
            (PI - mean_anomaly).rem_euclid(TAU) / n,
        )
    } else {
        let a = semi_major_axis.abs();
        let n = (mu / a.powi(3)).sqrt();
        // true anomaly in (-π, π] for the hyperbolic branch
        let nu = if true_anomaly > PI { true_anomaly - TAU } else { true_anomaly };
        let hyp_anomaly = 2.0 * (((ecc - 1.0) / (ecc + 1.0)).sqrt() * (nu / 2.0).tan()).atanh();
        let mean_anomaly = ecc * hyp_anomaly.sinh() - hyp_anomaly;
        (f64::INFINITY, f64::INFINITY, -mean_anomaly / n, f64::INFINITY)
    };

    OrbitState {
        body: body.name.clone(),
        apoapsis_radius,
        periapsis_radius,
        apoapsis_altitude: apoapsis_radius - body.equatorial_radius,
        periapsis_altitude: periapsis_radius - body.equatorial_radius,
        semi_major_axis,
        eccentricity: ecc,
        period,
        time_to_apoapsis,
        time_to_periapsis,
        time_to_soi_change: None,
        next_orbit: None,
    }
}

/// Gravitational acceleration of a point mass at the origin.
pub fn gravity(pos: Vec3D<f64>, mu: f64) -> Vec3D<f64> {
    let r = pos.abs();
    pos * (-mu / (r * r * r))
}

/// One classic fourth-order Runge-Kutta step under central gravity plus a
/// constant extra acceleration.
pub fn rk4_step(
    pos: Vec3D<f64>,
    vel: Vec3D<f64>,
    mu: f64,
    extra: Vec3D<f64>,
    dt: f64,
) -> (Vec3D<f64>, Vec3D<f64>) {
    let acc = |p: Vec3D<f64>| gravity(p, mu) + extra;

    let k1_v = acc(pos);
    let k1_p = vel;
    let k2_v = acc(pos + k1_p * (dt / 2.0));
    let k2_p = vel + k1_v * (dt / 2.0);
    let k3_v = acc(pos + k2_p * (dt / 2.0));
    let k3_p = vel + k2_v * (dt / 2.0);
    let k4_v = acc(pos + k3_p * dt);
    let k4_p = vel + k3_v * dt;

    let new_pos = pos + (k1_p + k2_p * 2.0 + k3_p * 2.0 + k4_p) * (dt / 6.0);
    let new_vel = vel + (k1_v + k2_v * 2.0 + k3_v * 2.0 + k4_v) * (dt / 6.0);
    (new_pos, new_vel)
}

/// State vector at the periapsis of an orbit given by its apsides. The orbit
/// lies in the `x`/`z` plane with motion towards increasing planar angle.
pub fn periapsis_state(apoapsis_radius: f64, periapsis_radius: f64, mu: f64) -> (Vec3D<f64>, Vec3D<f64>) {
    let sma = (apoapsis_radius + periapsis_radius) / 2.0;
    let speed = (mu * (2.0 / periapsis_radius - 1.0 / sma)).sqrt();
    (Vec3D::new(periapsis_radius, 0.0, 0.0), Vec3D::new(0.0, 0.0, speed))
}
