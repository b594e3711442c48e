use super::maneuver_node::{ManeuverKind, ManeuverNode};
use crate::flight_control::{
    common::{advance_past, normalize_angle},
    guidance_error::GuidanceError,
    orbit::{BodyState, VehicleState, burn_duration, delta_v, half_period},
};
use std::f64::consts::PI;

/// Computes when and how much velocity change a maneuver needs.
///
/// All planning functions are pure: they take a fresh telemetry snapshot
/// and return a node, nothing is registered with the vessel here.
#[derive(Debug, Clone, Copy)]
pub struct NodeScheduler {
    /// Angular lead of the departure burn, compensating for the deflection
    /// inside the target's sphere of influence.
    lead_angle: f64,
}

impl NodeScheduler {
    pub fn new(lead_angle: f64) -> Self { Self { lead_angle } }

    pub fn lead_angle(&self) -> f64 { self.lead_angle }

    /// Plans the burn raising the periapsis to the current apoapsis.
    ///
    /// # Errors
    /// - [`GuidanceError::GeometryInfeasible`] if the orbit is open.
    /// - [`GuidanceError::Input`] for non-physical telemetry.
    pub fn plan_circularization(
        &self,
        now: f64,
        vehicle: &VehicleState,
        body: &BodyState,
    ) -> Result<ManeuverNode, GuidanceError> {
        let orbit = &vehicle.orbit;
        orbit.validate()?;
        if !orbit.is_closed() || !orbit.time_to_apoapsis.is_finite() {
            return Err(GuidanceError::GeometryInfeasible("circularization on an open orbit"));
        }
        let apoapsis = orbit.apoapsis_radius;
        let dv = delta_v(apoapsis, orbit.semi_major_axis, apoapsis, body.gravitational_parameter)?;
        let duration = Self::burn_time(dv, vehicle)?;
        Ok(ManeuverNode::prograde(
            ManeuverKind::Circularization,
            now + orbit.time_to_apoapsis,
            dv,
            duration,
        ))
    }

    /// Plans the departure burn of a Hohmann transfer towards `target`, a
    /// body orbiting the same primary as the vessel.
    ///
    /// `vessel_angle` and `target_angle` are the current planar angles of the
    /// vessel and the target in the primary's non-rotating frame. The burn is
    /// placed at the first point ahead of the vessel that lies opposite the
    /// target's predicted arrival position, offset by the lead angle.
    ///
    /// # Errors
    /// - [`GuidanceError::GeometryInfeasible`] if the vessel orbit is open, the
    ///   target does not orbit the primary, or an angle is not finite.
    /// - [`GuidanceError::Input`] for non-physical telemetry.
    pub fn plan_hohmann_departure(
        &self,
        now: f64,
        vehicle: &VehicleState,
        primary: &BodyState,
        target: &BodyState,
        vessel_angle: f64,
        target_angle: f64,
    ) -> Result<ManeuverNode, GuidanceError> {
        let orbit = &vehicle.orbit;
        orbit.validate()?;
        if !orbit.is_closed() {
            return Err(GuidanceError::GeometryInfeasible("departure from an open orbit"));
        }
        if !target.orbits(&primary.name) {
            return Err(GuidanceError::GeometryInfeasible("target does not orbit the current body"));
        }
        let (Some(target_radius), Some(target_omega)) =
            (target.orbit_radius(), target.mean_angular_velocity())
        else {
            return Err(GuidanceError::GeometryInfeasible("target orbit is degenerate"));
        };
        let vessel_omega = orbit
            .mean_angular_velocity()
            .ok_or(GuidanceError::GeometryInfeasible("vessel orbit has no period"))?;

        let mu = primary.gravitational_parameter;
        let transfer_sma = (orbit.apoapsis_radius + target_radius + target.equatorial_radius) / 2.0;
        if !transfer_sma.is_finite() || transfer_sma <= 0.0 {
            return Err(GuidanceError::GeometryInfeasible("transfer orbit is not elliptical"));
        }
        let transfer_time = half_period(transfer_sma, mu)?;

        let predicted = predict_target_angle(target_angle, transfer_time, target_omega);
        let start = departure_angle(predicted, self.lead_angle, vessel_angle)
            .ok_or(GuidanceError::GeometryInfeasible("no forward departure angle"))?;
        let time_before_node = (start - vessel_angle) / vessel_omega;
        if !time_before_node.is_finite() || time_before_node <= 0.0 {
            return Err(GuidanceError::GeometryInfeasible("departure window already passed"));
        }

        let dv = delta_v(orbit.apoapsis_radius, orbit.semi_major_axis, transfer_sma, mu)?;
        let duration = Self::burn_time(dv, vehicle)?;
        Ok(ManeuverNode::prograde(ManeuverKind::Departure, now + time_before_node, dv, duration))
    }

    /// Plans the correction at the periapsis of the orbit patch following the
    /// next sphere-of-influence change, using the target's gravity.
    ///
    /// # Errors
    /// - [`GuidanceError::GeometryInfeasible`] if no encounter with `target` is
    ///   ahead, or the encounter periapsis lies at or below the target's surface.
    /// - [`GuidanceError::Input`] for non-physical telemetry.
    pub fn plan_mid_course(
        &self,
        now: f64,
        vehicle: &VehicleState,
        target: &BodyState,
    ) -> Result<ManeuverNode, GuidanceError> {
        let orbit = &vehicle.orbit;
        let (Some(time_to_soi_change), Some(next)) = (orbit.time_to_soi_change, orbit.next_orbit.as_deref())
        else {
            return Err(GuidanceError::GeometryInfeasible("no sphere-of-influence change ahead"));
        };
        if next.body != target.name {
            return Err(GuidanceError::GeometryInfeasible("encounter is not with the target"));
        }
        if !time_to_soi_change.is_finite() || !next.time_to_periapsis.is_finite() {
            return Err(GuidanceError::GeometryInfeasible("encounter time is not finite"));
        }
        if next.periapsis_radius.is_nan() || next.periapsis_radius <= target.equatorial_radius {
            return Err(GuidanceError::GeometryInfeasible("encounter periapsis below the target surface"));
        }
        let dv = delta_v(
            next.periapsis_radius,
            next.semi_major_axis,
            next.periapsis_radius,
            target.gravitational_parameter,
        )?;
        let duration = Self::burn_time(dv, vehicle)?;
        Ok(ManeuverNode::prograde(
            ManeuverKind::MidCourse,
            now + time_to_soi_change + next.time_to_periapsis,
            dv,
            duration,
        ))
    }

    fn burn_time(dv: f64, vehicle: &VehicleState) -> Result<f64, GuidanceError> {
        Ok(burn_duration(dv, vehicle.available_thrust, vehicle.specific_impulse, vehicle.mass)?)
    }
}

/// Planar angle of a body after `dt` seconds at constant angular velocity,
/// normalized to `(-π, π]`.
pub fn predict_target_angle(current_angle: f64, dt: f64, angular_velocity: f64) -> f64 {
    normalize_angle(current_angle + dt * angular_velocity)
}

/// Vessel angle at which the departure burn starts: opposite the predicted
/// target position plus `lead`, advanced by whole turns until it lies
/// strictly ahead of `vessel_angle`.
pub fn departure_angle(predicted_target_angle: f64, lead: f64, vessel_angle: f64) -> Option<f64> {
    let opposite = normalize_angle(predicted_target_angle + PI + lead);
    if opposite.is_nan() {
        return None;
    }
    advance_past(opposite, vessel_angle)
}
