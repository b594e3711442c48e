use super::{
    kepler::{orbit_from_state, periapsis_state, rk4_step},
    sim_body::SimSystem,
};
use crate::flight_control::{
    common::Vec3D,
    orbit::{BodyState, OrbitState, STANDARD_GRAVITY, VehicleState},
    vessel_link::{Actuation, LinkError, NodeHandle, ReferenceFrame, Telemetry},
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;

/// One engine together with the tank it drains.
#[derive(Debug, Clone, PartialEq)]
pub struct SimEngine {
    pub name: String,
    pub dry_mass: f64,
    pub propellant: f64,
    pub max_thrust: f64,
    pub specific_impulse: f64,
    /// Solid motors burn at full thrust once ignited, regardless of throttle.
    pub solid: bool,
    /// Stage activation count at which the engine ignites.
    pub ignites_at: u32,
    /// Stage activation count at which the engine is jettisoned.
    pub drops_at: Option<u32>,
}

/// A staged vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct SimVehicle {
    pub payload_mass: f64,
    pub engines: Vec<SimEngine>,
}

impl SimVehicle {
    /// Three-stage rocket: solid boosters around a liquid core, and a liquid
    /// upper stage for the transfer.
    pub fn demo_rocket() -> Self {
        Self {
            payload_mass: 1000.0,
            engines: vec![
                SimEngine {
                    name: String::from("upper"),
                    dry_mass: 500.0,
                    propellant: 3000.0,
                    max_thrust: 60_000.0,
                    specific_impulse: 345.0,
                    solid: false,
                    ignites_at: 3,
                    drops_at: None,
                },
                SimEngine {
                    name: String::from("core"),
                    dry_mass: 1500.0,
                    propellant: 12_000.0,
                    max_thrust: 280_000.0,
                    specific_impulse: 310.0,
                    solid: false,
                    ignites_at: 1,
                    drops_at: Some(3),
                },
                SimEngine {
                    name: String::from("booster"),
                    dry_mass: 800.0,
                    propellant: 4000.0,
                    max_thrust: 300_000.0,
                    specific_impulse: 250.0,
                    solid: true,
                    ignites_at: 1,
                    drops_at: Some(2),
                },
            ],
        }
    }

    /// A single liquid engine that is already live, 60% of `mass` is propellant.
    pub fn single_stage(mass: f64, thrust: f64, specific_impulse: f64) -> Self {
        Self {
            payload_mass: 0.0,
            engines: vec![SimEngine {
                name: String::from("main"),
                dry_mass: 0.4 * mass,
                propellant: 0.6 * mass,
                max_thrust: thrust,
                specific_impulse,
                solid: false,
                ignites_at: 0,
                drops_at: None,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Attitude {
    PitchHeading { pitch: f64, heading: f64 },
    Direction { frame: ReferenceFrame, direction: Vec3D<f64> },
}

#[derive(Debug, Clone)]
struct SimNode {
    handle: NodeHandle,
    ut: f64,
    /// (prograde, normal, radial)
    delta_v: Vec3D<f64>,
    /// Velocity change delivered along the burn axis so far.
    delivered: f64,
}

#[derive(Debug, Clone)]
struct SimState {
    ut: f64,
    body: String,
    pos: Vec3D<f64>,
    vel: Vec3D<f64>,
    stage: u32,
    vehicle: SimVehicle,
    throttle: f64,
    attitude: Attitude,
    nodes: Vec<SimNode>,
    next_handle: u64,
    rcs: bool,
    sas: bool,
    autopilot_engaged: bool,
    autopilot_gains: (f64, f64, f64),
}

/// Planar patched-conic simulation of a vessel, driven through the same
/// collaborator interface as a real vessel connection.
///
/// The simulated clock only advances through `idle` and `warp_to`. Attitude
/// changes are instantaneous, thrust follows the commanded direction.
pub struct SimVessel {
    system: SimSystem,
    state: Mutex<SimState>,
}

impl SimVessel {
    /// Integration step while an engine produces thrust.
    const POWERED_DT: f64 = 0.02;
    /// Longest integration step while coasting.
    const COAST_DT: f64 = 1.0;
    /// Orbital arc in radians a coasting step may sweep, keeps small orbits
    /// as well resolved as large ones.
    const COAST_ARC: f64 = 0.01;
    /// Integration step of the sphere-of-influence prediction.
    const PREDICTION_DT: f64 = 10.0;
    /// Longest time span searched for a sphere-of-influence change.
    const PREDICTION_HORIZON: f64 = 300_000.0;

    /// Places `vehicle` on the surface of `body`, at rest.
    ///
    /// # Errors
    /// [`LinkError::UnknownBody`] if `body` is not part of `system`.
    pub fn on_launchpad(system: SimSystem, body: &str, vehicle: SimVehicle) -> Result<Self, LinkError> {
        let radius = system
            .body(body)
            .ok_or_else(|| LinkError::UnknownBody(body.to_string()))?
            .state()
            .equatorial_radius;
        Ok(Self::with_state(system, body, Vec3D::new(radius, 0.0, 0.0), Vec3D::zero(), vehicle))
    }

    /// Places `vehicle` at the periapsis of an orbit around `body`.
    ///
    /// # Errors
    /// [`LinkError::UnknownBody`] if `body` is not part of `system`.
    pub fn in_orbit(
        system: SimSystem,
        body: &str,
        apoapsis_radius: f64,
        periapsis_radius: f64,
        vehicle: SimVehicle,
    ) -> Result<Self, LinkError> {
        let mu = system.body(body).ok_or_else(|| LinkError::UnknownBody(body.to_string()))?.mu();
        let (pos, vel) = periapsis_state(apoapsis_radius, periapsis_radius, mu);
        Ok(Self::with_state(system, body, pos, vel, vehicle))
    }

    fn with_state(
        system: SimSystem,
        body: &str,
        pos: Vec3D<f64>,
        vel: Vec3D<f64>,
        vehicle: SimVehicle,
    ) -> Self {
        let state = SimState {
            ut: 0.0,
            body: body.to_string(),
            pos,
            vel,
            stage: 0,
            vehicle,
            throttle: 0.0,
            attitude: Attitude::PitchHeading { pitch: 90.0, heading: 90.0 },
            nodes: Vec::new(),
            next_handle: 1,
            rcs: false,
            sas: false,
            autopilot_engaged: false,
            autopilot_gains: (0.0, 0.0, 0.0),
        };
        Self { system, state: Mutex::new(state) }
    }

    pub fn system(&self) -> &SimSystem { &self.system }

    /// Number of stage activations so far.
    pub async fn stage(&self) -> u32 { self.state.lock().await.stage }

    pub async fn autopilot(&self) -> (bool, (f64, f64, f64)) {
        let st = self.state.lock().await;
        (st.autopilot_engaged, st.autopilot_gains)
    }

    pub async fn rcs_and_sas(&self) -> (bool, bool) {
        let st = self.state.lock().await;
        (st.rcs, st.sas)
    }

    /// Registered maneuver nodes and their execution times.
    pub async fn nodes(&self) -> Vec<(NodeHandle, f64)> {
        self.state.lock().await.nodes.iter().map(|n| (n.handle, n.ut)).collect()
    }

    fn body_state(&self, name: &str) -> Result<&BodyState, LinkError> {
        self.system.body(name).map(|b| b.state()).ok_or_else(|| LinkError::UnknownBody(name.to_string()))
    }

    fn frame_origin(&self, frame: &ReferenceFrame, ut: f64) -> Result<Vec3D<f64>, LinkError> {
        match frame {
            ReferenceFrame::BodyNonRotating(name) => self
                .system
                .absolute_position(name, ut)
                .ok_or_else(|| LinkError::UnknownBody(name.clone())),
            ReferenceFrame::Node(_) => {
                Err(LinkError::Rejected(String::from("positions are not resolvable in node frames")))
            }
        }
    }

    fn advance(&self, st: &mut SimState, span: f64) {
        let mut remaining = span;
        while remaining > 0.0 {
            let (force, _) = Self::thrust(st);
            let step = if force > 0.0 { Self::POWERED_DT } else { Self::coast_step(st) }.min(remaining);
            self.substep(st, step);
            remaining -= step;
        }
    }

    fn coast_step(st: &SimState) -> f64 {
        let speed = st.vel.abs();
        if speed > 0.0 {
            (Self::COAST_ARC * st.pos.abs() / speed).clamp(Self::POWERED_DT, Self::COAST_DT)
        } else {
            Self::COAST_DT
        }
    }

    fn substep(&self, st: &mut SimState, dt: f64) {
        let Some(body) = self.system.body(&st.body) else { return };
        let (force, flows) = Self::thrust(st);
        let mass = Self::mass(st);
        let thrust_acc = if force > 0.0 && mass > 0.0 {
            Self::thrust_direction(st) * (force / mass)
        } else {
            Vec3D::zero()
        };
        for node in &mut st.nodes {
            let axis = Self::burn_axis(node, st.pos, st.vel);
            node.delivered += thrust_acc.dot(axis) * dt;
        }

        let (pos, vel) = rk4_step(st.pos, st.vel, body.mu(), thrust_acc, dt);
        st.pos = pos;
        st.vel = vel;
        for (idx, flow) in flows {
            let engine = &mut st.vehicle.engines[idx];
            engine.propellant = (engine.propellant - flow * dt).max(0.0);
        }
        st.ut += dt;

        let radius = body.state().equatorial_radius;
        if st.pos.abs() < radius {
            st.pos = st.pos.normalize() * radius;
            st.vel = Vec3D::zero();
        }
        self.switch_soi(st);
    }

    fn switch_soi(&self, st: &mut SimState) {
        let current = st.body.clone();
        for child in self.system.children(&current) {
            let rel_pos = st.pos - child.position(st.ut);
            if rel_pos.abs() < child.state().sphere_of_influence {
                st.vel = st.vel - child.velocity(st.ut);
                st.pos = rel_pos;
                st.body = child.name().to_string();
                return;
            }
        }
        let Some(body) = self.system.body(&st.body) else { return };
        if let Some(parent) = body.parent() {
            if st.pos.abs() > body.state().sphere_of_influence {
                st.pos = st.pos + body.position(st.ut);
                st.vel = st.vel + body.velocity(st.ut);
                st.body = parent.to_string();
            }
        }
    }

    fn engine_attached(stage: u32, engine: &SimEngine) -> bool { engine.drops_at.is_none_or(|d| stage < d) }

    fn engine_live(stage: u32, engine: &SimEngine) -> bool {
        Self::engine_attached(stage, engine) && stage >= engine.ignites_at && engine.propellant > 0.0
    }

    /// Total thrust and the mass flow of every burning engine.
    fn thrust(st: &SimState) -> (f64, Vec<(usize, f64)>) {
        let mut force = 0.0;
        let mut flows = Vec::new();
        for (idx, engine) in st.vehicle.engines.iter().enumerate() {
            if !Self::engine_live(st.stage, engine) {
                continue;
            }
            let f = if engine.solid { engine.max_thrust } else { engine.max_thrust * st.throttle };
            if f > 0.0 {
                force += f;
                flows.push((idx, f / (engine.specific_impulse * STANDARD_GRAVITY)));
            }
        }
        (force, flows)
    }

    fn mass(st: &SimState) -> f64 {
        st.vehicle.payload_mass
            + st
                .vehicle
                .engines
                .iter()
                .filter(|e| Self::engine_attached(st.stage, e))
                .map(|e| e.dry_mass + e.propellant)
                .sum::<f64>()
    }

    fn burn_axis(node: &SimNode, pos: Vec3D<f64>, vel: Vec3D<f64>) -> Vec3D<f64> {
        let prograde = if vel.abs() > 0.0 { vel.normalize() } else { pos.normalize() };
        let normal = pos.cross(vel).normalize();
        let radial = (pos - prograde * pos.dot(prograde)).normalize();
        let dv = node.delta_v;
        (prograde * dv.x() + normal * dv.y() + radial * dv.z()).normalize()
    }

    fn thrust_direction(st: &SimState) -> Vec3D<f64> {
        let up = st.pos.normalize();
        match &st.attitude {
            Attitude::PitchHeading { pitch, heading } => {
                let east = Vec3D::new(-up.z(), 0.0, up.x());
                let (p, h) = (pitch.to_radians(), heading.to_radians());
                (up * p.sin() + east * (p.cos() * h.sin())).normalize()
            }
            Attitude::Direction { frame: ReferenceFrame::Node(handle), direction } => st
                .nodes
                .iter()
                .find(|n| n.handle == *handle)
                .map_or(up, |n| Self::burn_axis(n, st.pos, st.vel) * direction.y().signum()),
            Attitude::Direction { frame: ReferenceFrame::BodyNonRotating(_), direction } => {
                direction.normalize()
            }
        }
    }

    /// Searches the next sphere-of-influence change along the coasting
    /// trajectory, returning its time offset and the following orbit patch.
    fn predict_soi_change(&self, st: &SimState, orbit: &OrbitState) -> Option<(f64, OrbitState)> {
        let body = self.system.body(&st.body)?;
        let soi = body.state().sphere_of_influence;
        let clear_of_moons = self.system.children(&st.body).all(|child| {
            let (r, reach) = (
                child.state().orbit_radius().unwrap_or(0.0),
                child.state().sphere_of_influence,
            );
            orbit.apoapsis_radius < r - reach || orbit.periapsis_radius > r + reach
        });
        if orbit.is_closed() && orbit.apoapsis_radius < soi && clear_of_moons {
            return None;
        }

        let horizon = if orbit.period.is_finite() {
            orbit.period.min(Self::PREDICTION_HORIZON)
        } else {
            Self::PREDICTION_HORIZON
        };
        let (mut pos, mut vel) = (st.pos, st.vel);
        let mut t = 0.0;
        while t < horizon {
            let (p, v) = rk4_step(pos, vel, body.mu(), Vec3D::zero(), Self::PREDICTION_DT);
            pos = p;
            vel = v;
            t += Self::PREDICTION_DT;
            let ut = st.ut + t;
            for child in self.system.children(&st.body) {
                let rel_pos = pos - child.position(ut);
                if rel_pos.abs() < child.state().sphere_of_influence {
                    let rel_vel = vel - child.velocity(ut);
                    return Some((t, orbit_from_state(rel_pos, rel_vel, child.state())));
                }
            }
            if pos.abs() > soi {
                let parent = self.system.body(body.parent()?)?;
                let abs_pos = pos + body.position(ut);
                let abs_vel = vel + body.velocity(ut);
                return Some((t, orbit_from_state(abs_pos, abs_vel, parent.state())));
            }
        }
        None
    }

    fn orbit_of(&self, st: &SimState) -> Result<OrbitState, LinkError> {
        let body = self.body_state(&st.body)?;
        let mut orbit = orbit_from_state(st.pos, st.vel, body);
        if let Some((dt, next)) = self.predict_soi_change(st, &orbit) {
            orbit.time_to_soi_change = Some(dt);
            orbit.next_orbit = Some(Box::new(next));
        }
        Ok(orbit)
    }
}

#[async_trait]
impl Telemetry for SimVessel {
    async fn ut(&self) -> Result<f64, LinkError> { Ok(self.state.lock().await.ut) }

    async fn vehicle(&self) -> Result<VehicleState, LinkError> {
        let st = self.state.lock().await;
        let live: Vec<&SimEngine> =
            st.vehicle.engines.iter().filter(|e| Self::engine_live(st.stage, e)).collect();
        let available_thrust: f64 = live.iter().map(|e| e.max_thrust).sum();
        let flow_weight: f64 = live.iter().map(|e| e.max_thrust / e.specific_impulse).sum();
        let specific_impulse = if flow_weight > 0.0 { available_thrust / flow_weight } else { 0.0 };
        Ok(VehicleState {
            mass: Self::mass(&st),
            available_thrust,
            specific_impulse,
            orbit: self.orbit_of(&st)?,
        })
    }

    async fn orbit(&self) -> Result<OrbitState, LinkError> {
        let st = self.state.lock().await;
        self.orbit_of(&st)
    }

    async fn mean_altitude(&self) -> Result<f64, LinkError> {
        let st = self.state.lock().await;
        Ok(st.pos.abs() - self.body_state(&st.body)?.equatorial_radius)
    }

    async fn current_body(&self) -> Result<BodyState, LinkError> {
        let st = self.state.lock().await;
        self.body_state(&st.body).cloned()
    }

    async fn body(&self, name: &str) -> Result<BodyState, LinkError> { self.body_state(name).cloned() }

    async fn vessel_position(&self, frame: &ReferenceFrame) -> Result<Vec3D<f64>, LinkError> {
        let st = self.state.lock().await;
        let own = self
            .system
            .absolute_position(&st.body, st.ut)
            .ok_or_else(|| LinkError::UnknownBody(st.body.clone()))?;
        Ok(own + st.pos - self.frame_origin(frame, st.ut)?)
    }

    async fn body_position(&self, name: &str, frame: &ReferenceFrame) -> Result<Vec3D<f64>, LinkError> {
        let ut = self.state.lock().await.ut;
        let body = self
            .system
            .absolute_position(name, ut)
            .ok_or_else(|| LinkError::UnknownBody(name.to_string()))?;
        Ok(body - self.frame_origin(frame, ut)?)
    }

    async fn resource_amount(&self, name: &str) -> Result<f64, LinkError> {
        let st = self.state.lock().await;
        let solid = match name {
            "SolidFuel" => true,
            "LiquidFuel" => false,
            _ => return Ok(0.0),
        };
        Ok(st
            .vehicle
            .engines
            .iter()
            .filter(|e| e.solid == solid && Self::engine_attached(st.stage, e))
            .map(|e| e.propellant)
            .sum())
    }

    async fn remaining_burn(&self, node: NodeHandle, frame: &ReferenceFrame) -> Result<Vec3D<f64>, LinkError> {
        let st = self.state.lock().await;
        let sim_node = st.nodes.iter().find(|n| n.handle == node).ok_or(LinkError::UnknownNode(node))?;
        let remaining = sim_node.delta_v.abs() - sim_node.delivered;
        match frame {
            ReferenceFrame::Node(_) => Ok(Vec3D::new(0.0, remaining, 0.0)),
            ReferenceFrame::BodyNonRotating(_) => Ok(Self::burn_axis(sim_node, st.pos, st.vel) * remaining),
        }
    }

    async fn throttle(&self) -> Result<f64, LinkError> { Ok(self.state.lock().await.throttle) }

    async fn idle(&self, dt: Duration) {
        {
            let mut st = self.state.lock().await;
            self.advance(&mut st, dt.as_secs_f64());
        }
        tokio::task::yield_now().await;
    }
}

#[async_trait]
impl Actuation for SimVessel {
    async fn set_throttle(&self, throttle: f64) -> Result<(), LinkError> {
        self.state.lock().await.throttle = throttle.clamp(0.0, 1.0);
        Ok(())
    }

    async fn set_rcs(&self, enabled: bool) -> Result<(), LinkError> {
        self.state.lock().await.rcs = enabled;
        Ok(())
    }

    async fn set_sas(&self, enabled: bool) -> Result<(), LinkError> {
        self.state.lock().await.sas = enabled;
        Ok(())
    }

    async fn engage_autopilot(&self) -> Result<(), LinkError> {
        self.state.lock().await.autopilot_engaged = true;
        Ok(())
    }

    async fn set_autopilot_gains(&self, kp: f64, ki: f64, kd: f64) -> Result<(), LinkError> {
        self.state.lock().await.autopilot_gains = (kp, ki, kd);
        Ok(())
    }

    async fn target_pitch_and_heading(&self, pitch: f64, heading: f64) -> Result<(), LinkError> {
        self.state.lock().await.attitude = Attitude::PitchHeading { pitch, heading };
        Ok(())
    }

    async fn target_direction(&self, frame: &ReferenceFrame, direction: Vec3D<f64>) -> Result<(), LinkError> {
        let mut st = self.state.lock().await;
        match frame {
            ReferenceFrame::Node(handle) if !st.nodes.iter().any(|n| n.handle == *handle) => {
                return Err(LinkError::UnknownNode(*handle));
            }
            ReferenceFrame::BodyNonRotating(name) if self.system.body(name).is_none() => {
                return Err(LinkError::UnknownBody(name.clone()));
            }
            _ => (),
        }
        st.attitude = Attitude::Direction { frame: frame.clone(), direction };
        Ok(())
    }

    async fn wait_attitude(&self) -> Result<(), LinkError> { Ok(()) }

    async fn activate_next_stage(&self) -> Result<(), LinkError> {
        self.state.lock().await.stage += 1;
        Ok(())
    }

    async fn warp_to(&self, ut: f64) -> Result<(), LinkError> {
        let mut st = self.state.lock().await;
        let span = ut - st.ut;
        if span > 0.0 {
            self.advance(&mut st, span);
        }
        Ok(())
    }

    async fn add_node(&self, ut: f64, prograde: f64, normal: f64, radial: f64) -> Result<NodeHandle, LinkError> {
        let mut st = self.state.lock().await;
        let handle = NodeHandle(st.next_handle);
        st.next_handle += 1;
        st.nodes.push(SimNode { handle, ut, delta_v: Vec3D::new(prograde, normal, radial), delivered: 0.0 });
        Ok(handle)
    }

    async fn remove_node(&self, node: NodeHandle) -> Result<(), LinkError> {
        let mut st = self.state.lock().await;
        let before = st.nodes.len();
        st.nodes.retain(|n| n.handle != node);
        if st.nodes.len() == before { Err(LinkError::UnknownNode(node)) } else { Ok(()) }
    }
}
