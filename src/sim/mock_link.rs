use crate::flight_control::{
    common::Vec3D,
    orbit::{BodyOrbit, BodyState, OrbitState, VehicleState},
    vessel_link::{Actuation, LinkError, NodeHandle, ReferenceFrame, Telemetry},
};
use async_trait::async_trait;
use std::{collections::HashMap, f64::consts::TAU, time::Duration};
use tokio::sync::Mutex;

type Dynamics = Box<dyn FnMut(&mut MockState, f64) + Send>;
type NodeHook = Box<dyn FnMut(&mut MockState, NodeHandle) + Send>;

/// Scripted collaborator state, freely editable by tests.
pub struct MockState {
    pub ut: f64,
    pub throttle: f64,
    /// Every throttle command in order.
    pub throttle_log: Vec<f64>,
    pub vehicle: VehicleState,
    pub mean_altitude: f64,
    pub resources: HashMap<String, f64>,
    pub bodies: HashMap<String, BodyState>,
    pub current_body: String,
    /// Positions in the current body's frame.
    pub body_positions: HashMap<String, Vec3D<f64>>,
    pub vessel_position: Vec3D<f64>,
    /// Registered nodes as (handle, ut, prograde delta-v).
    pub nodes: Vec<(NodeHandle, f64, f64)>,
    pub removed_nodes: Vec<NodeHandle>,
    remaining: HashMap<NodeHandle, f64>,
    next_handle: u64,
    /// Velocity change per second delivered at full throttle.
    pub burn_rate: f64,
    pub stage_count: u32,
    pub pitch_commands: Vec<(f64, f64)>,
    pub warps: Vec<f64>,
    pub directions: Vec<(ReferenceFrame, Vec3D<f64>)>,
    pub rcs: Option<bool>,
    pub sas: Option<bool>,
    pub autopilot_engaged: bool,
    pub autopilot_gains: Option<(f64, f64, f64)>,
    /// `wait_attitude` never resolves.
    pub hang_attitude: bool,
    /// `ut` fails while the throttle is at 1.
    pub fail_ut_at_full_throttle: bool,
    /// `ut` fails once the clock reached this time.
    pub fail_ut_from: Option<f64>,
    /// Every read fails.
    pub disconnected: bool,
    /// Called with the elapsed time whenever the clock advances.
    pub dynamics: Option<Dynamics>,
    /// Called after a node was removed.
    pub on_node_removed: Option<NodeHook>,
}

impl MockState {
    pub fn body(name: &str, mu: f64, radius: f64) -> BodyState {
        BodyState {
            name: name.to_string(),
            gravitational_parameter: mu,
            equatorial_radius: radius,
            sphere_of_influence: f64::INFINITY,
            orbit: None,
        }
    }

    pub fn moon(name: &str, mu: f64, radius: f64, parent: &BodyState, orbit_radius: f64, soi: f64) -> BodyState {
        let period = TAU * (orbit_radius.powi(3) / parent.gravitational_parameter).sqrt();
        BodyState {
            name: name.to_string(),
            gravitational_parameter: mu,
            equatorial_radius: radius,
            sphere_of_influence: soi,
            orbit: Some(BodyOrbit { parent: parent.name.clone(), radius: orbit_radius, period }),
        }
    }

    /// An elliptical orbit with the vessel at its periapsis.
    pub fn closed_orbit(body: &BodyState, apoapsis_radius: f64, periapsis_radius: f64) -> OrbitState {
        let mu = body.gravitational_parameter;
        let sma = (apoapsis_radius + periapsis_radius) / 2.0;
        let period = TAU * (sma.powi(3) / mu).sqrt();
        OrbitState {
            body: body.name.clone(),
            apoapsis_radius,
            periapsis_radius,
            apoapsis_altitude: apoapsis_radius - body.equatorial_radius,
            periapsis_altitude: periapsis_radius - body.equatorial_radius,
            semi_major_axis: sma,
            eccentricity: (apoapsis_radius - periapsis_radius) / (apoapsis_radius + periapsis_radius),
            period,
            time_to_apoapsis: period / 2.0,
            time_to_periapsis: 0.0,
            time_to_soi_change: None,
            next_orbit: None,
        }
    }

    /// Vessel of 5 t with 60 kN at 345 s around a small body, apoapsis
    /// 100 km and periapsis 80 km radius.
    pub fn new() -> Self {
        let body = Self::body("Pebble", 3.5e12, 50_000.0);
        let orbit = Self::closed_orbit(&body, 100_000.0, 80_000.0);
        let mut bodies = HashMap::new();
        bodies.insert(body.name.clone(), body.clone());
        Self {
            ut: 0.0,
            throttle: 0.0,
            throttle_log: Vec::new(),
            vehicle: VehicleState { mass: 5000.0, available_thrust: 60_000.0, specific_impulse: 345.0, orbit },
            mean_altitude: 0.0,
            resources: HashMap::new(),
            bodies,
            current_body: body.name,
            body_positions: HashMap::new(),
            vessel_position: Vec3D::new(80_000.0, 0.0, 0.0),
            nodes: Vec::new(),
            removed_nodes: Vec::new(),
            remaining: HashMap::new(),
            next_handle: 1,
            burn_rate: 12.0,
            stage_count: 0,
            pitch_commands: Vec::new(),
            warps: Vec::new(),
            directions: Vec::new(),
            rcs: None,
            sas: None,
            autopilot_engaged: false,
            autopilot_gains: None,
            hang_attitude: false,
            fail_ut_at_full_throttle: false,
            fail_ut_from: None,
            disconnected: false,
            dynamics: None,
            on_node_removed: None,
        }
    }

    pub fn remaining(&self, node: NodeHandle) -> Option<f64> { self.remaining.get(&node).copied() }

    fn advance(&mut self, dt: f64) {
        self.ut += dt;
        let delivered = self.throttle * self.burn_rate * dt;
        for remaining in self.remaining.values_mut() {
            *remaining -= delivered;
        }
        if let Some(mut dynamics) = self.dynamics.take() {
            dynamics(self, dt);
            self.dynamics = Some(dynamics);
        }
    }

    fn check_link(&self) -> Result<(), LinkError> {
        if self.disconnected { Err(LinkError::Disconnected) } else { Ok(()) }
    }
}

/// Scripted in-memory [`VesselLink`](crate::flight_control::vessel_link::VesselLink)
/// with fault injection.
pub struct MockLink {
    state: Mutex<MockState>,
}

impl MockLink {
    pub fn new(state: MockState) -> Self { Self { state: Mutex::new(state) } }

    /// Runs `f` on the scripted state.
    pub async fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut st = self.state.lock().await;
        f(&mut *st)
    }
}

#[async_trait]
impl Telemetry for MockLink {
    async fn ut(&self) -> Result<f64, LinkError> {
        let st = self.state.lock().await;
        st.check_link()?;
        if st.fail_ut_at_full_throttle && st.throttle >= 1.0 {
            return Err(LinkError::Disconnected);
        }
        if st.fail_ut_from.is_some_and(|from| st.ut >= from) {
            return Err(LinkError::Disconnected);
        }
        Ok(st.ut)
    }

    async fn vehicle(&self) -> Result<VehicleState, LinkError> {
        let st = self.state.lock().await;
        st.check_link()?;
        Ok(st.vehicle.clone())
    }

    async fn orbit(&self) -> Result<OrbitState, LinkError> {
        let st = self.state.lock().await;
        st.check_link()?;
        Ok(st.vehicle.orbit.clone())
    }

    async fn mean_altitude(&self) -> Result<f64, LinkError> {
        let st = self.state.lock().await;
        st.check_link()?;
        Ok(st.mean_altitude)
    }

    async fn current_body(&self) -> Result<BodyState, LinkError> {
        let st = self.state.lock().await;
        st.check_link()?;
        st.bodies.get(&st.current_body).cloned().ok_or_else(|| LinkError::UnknownBody(st.current_body.clone()))
    }

    async fn body(&self, name: &str) -> Result<BodyState, LinkError> {
        let st = self.state.lock().await;
        st.check_link()?;
        st.bodies.get(name).cloned().ok_or_else(|| LinkError::UnknownBody(name.to_string()))
    }

    async fn vessel_position(&self, _frame: &ReferenceFrame) -> Result<Vec3D<f64>, LinkError> {
        let st = self.state.lock().await;
        st.check_link()?;
        Ok(st.vessel_position)
    }

    async fn body_position(&self, name: &str, _frame: &ReferenceFrame) -> Result<Vec3D<f64>, LinkError> {
        let st = self.state.lock().await;
        st.check_link()?;
        st.body_positions.get(name).copied().ok_or_else(|| LinkError::UnknownBody(name.to_string()))
    }

    async fn resource_amount(&self, name: &str) -> Result<f64, LinkError> {
        let st = self.state.lock().await;
        st.check_link()?;
        Ok(st.resources.get(name).copied().unwrap_or(0.0))
    }

    async fn remaining_burn(&self, node: NodeHandle, _frame: &ReferenceFrame) -> Result<Vec3D<f64>, LinkError> {
        let st = self.state.lock().await;
        st.check_link()?;
        let remaining = st.remaining(node).ok_or(LinkError::UnknownNode(node))?;
        Ok(Vec3D::new(0.0, remaining, 0.0))
    }

    async fn throttle(&self) -> Result<f64, LinkError> {
        let st = self.state.lock().await;
        st.check_link()?;
        Ok(st.throttle)
    }

    async fn idle(&self, dt: Duration) {
        self.state.lock().await.advance(dt.as_secs_f64());
        tokio::task::yield_now().await;
    }
}

#[async_trait]
impl Actuation for MockLink {
    async fn set_throttle(&self, throttle: f64) -> Result<(), LinkError> {
        let mut st = self.state.lock().await;
        st.check_link()?;
        st.throttle = throttle;
        st.throttle_log.push(throttle);
        Ok(())
    }

    async fn set_rcs(&self, enabled: bool) -> Result<(), LinkError> {
        self.state.lock().await.rcs = Some(enabled);
        Ok(())
    }

    async fn set_sas(&self, enabled: bool) -> Result<(), LinkError> {
        self.state.lock().await.sas = Some(enabled);
        Ok(())
    }

    async fn engage_autopilot(&self) -> Result<(), LinkError> {
        self.state.lock().await.autopilot_engaged = true;
        Ok(())
    }

    async fn set_autopilot_gains(&self, kp: f64, ki: f64, kd: f64) -> Result<(), LinkError> {
        self.state.lock().await.autopilot_gains = Some((kp, ki, kd));
        Ok(())
    }

    async fn target_pitch_and_heading(&self, pitch: f64, heading: f64) -> Result<(), LinkError> {
        let mut st = self.state.lock().await;
        st.check_link()?;
        st.pitch_commands.push((pitch, heading));
        Ok(())
    }

    async fn target_direction(&self, frame: &ReferenceFrame, direction: Vec3D<f64>) -> Result<(), LinkError> {
        let mut st = self.state.lock().await;
        st.check_link()?;
        st.directions.push((frame.clone(), direction));
        Ok(())
    }

    async fn wait_attitude(&self) -> Result<(), LinkError> {
        let hang = self.state.lock().await.hang_attitude;
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn activate_next_stage(&self) -> Result<(), LinkError> {
        let mut st = self.state.lock().await;
        st.check_link()?;
        st.stage_count += 1;
        Ok(())
    }

    async fn warp_to(&self, ut: f64) -> Result<(), LinkError> {
        let mut st = self.state.lock().await;
        st.check_link()?;
        st.warps.push(ut);
        let span = ut - st.ut;
        if span > 0.0 {
            st.advance(span);
        }
        Ok(())
    }

    async fn add_node(&self, ut: f64, prograde: f64, _normal: f64, _radial: f64) -> Result<NodeHandle, LinkError> {
        let mut st = self.state.lock().await;
        st.check_link()?;
        let handle = NodeHandle(st.next_handle);
        st.next_handle += 1;
        st.nodes.push((handle, ut, prograde));
        st.remaining.insert(handle, prograde.abs());
        Ok(handle)
    }

    async fn remove_node(&self, node: NodeHandle) -> Result<(), LinkError> {
        let mut st = self.state.lock().await;
        st.nodes.retain(|(handle, _, _)| *handle != node);
        if st.remaining.remove(&node).is_none() {
            return Err(LinkError::UnknownNode(node));
        }
        st.removed_nodes.push(node);
        if let Some(mut hook) = st.on_node_removed.take() {
            hook(&mut *st, node);
            st.on_node_removed = Some(hook);
        }
        Ok(())
    }
}
