use super::{
    common::Vec3D,
    orbit::{BodyState, OrbitState, VehicleState},
};
use async_trait::async_trait;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Opaque identifier of a maneuver node registered with the actuation layer.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, serde::Serialize, serde::Deserialize)]
pub struct NodeHandle(pub u64);

/// Reference frames the collaborator can resolve vectors in.
#[derive(Debug, PartialEq, Eq, Clone, serde::Serialize, serde::Deserialize)]
pub enum ReferenceFrame {
    /// Non-rotating frame centred on the named body, orbital plane spanned by `x`/`z`.
    BodyNonRotating(String),
    /// Frame attached to a registered maneuver node, `y` is the burn axis.
    Node(NodeHandle),
}

impl Display for ReferenceFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceFrame::BodyNonRotating(body) => write!(f, "{body} (non-rotating)"),
            ReferenceFrame::Node(handle) => write!(f, "node #{}", handle.0),
        }
    }
}

/// Transport-level failures reported by a [`VesselLink`].
#[derive(Debug, Clone, PartialEq)]
pub enum LinkError {
    Disconnected,
    Timeout,
    Rejected(String),
    UnknownBody(String),
    UnknownNode(NodeHandle),
}

impl Display for LinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkError::Disconnected => write!(f, "link disconnected"),
            LinkError::Timeout => write!(f, "link request timed out"),
            LinkError::Rejected(why) => write!(f, "request rejected: {why}"),
            LinkError::UnknownBody(name) => write!(f, "unknown body '{name}'"),
            LinkError::UnknownNode(handle) => write!(f, "unknown maneuver node #{}", handle.0),
        }
    }
}

impl std::error::Error for LinkError {}

/// Read side of the vessel collaborator.
///
/// Every call returns a fresh sample, implementations must not hand out values
/// cached from an earlier poll. The collaborator also owns the clock: `ut` is
/// the simulated universal time in seconds and `idle` suspends the caller for
/// a span of that clock.
#[async_trait]
pub trait Telemetry: Send + Sync {
    async fn ut(&self) -> Result<f64, LinkError>;
    async fn vehicle(&self) -> Result<VehicleState, LinkError>;
    async fn orbit(&self) -> Result<OrbitState, LinkError>;
    async fn mean_altitude(&self) -> Result<f64, LinkError>;
    async fn current_body(&self) -> Result<BodyState, LinkError>;
    async fn body(&self, name: &str) -> Result<BodyState, LinkError>;
    async fn vessel_position(&self, frame: &ReferenceFrame) -> Result<Vec3D<f64>, LinkError>;
    async fn body_position(&self, name: &str, frame: &ReferenceFrame) -> Result<Vec3D<f64>, LinkError>;
    async fn resource_amount(&self, name: &str) -> Result<f64, LinkError>;
    /// Remaining velocity change of a registered node, resolved in `frame`.
    async fn remaining_burn(
        &self,
        node: NodeHandle,
        frame: &ReferenceFrame,
    ) -> Result<Vec3D<f64>, LinkError>;
    async fn throttle(&self) -> Result<f64, LinkError>;

    /// Suspends the caller for `dt` of simulated time.
    async fn idle(&self, dt: Duration) { tokio::time::sleep(dt).await; }
}

/// Write side of the vessel collaborator.
#[async_trait]
pub trait Actuation: Send + Sync {
    async fn set_throttle(&self, throttle: f64) -> Result<(), LinkError>;
    async fn set_rcs(&self, enabled: bool) -> Result<(), LinkError>;
    async fn set_sas(&self, enabled: bool) -> Result<(), LinkError>;
    async fn engage_autopilot(&self) -> Result<(), LinkError>;
    async fn set_autopilot_gains(&self, kp: f64, ki: f64, kd: f64) -> Result<(), LinkError>;
    async fn target_pitch_and_heading(&self, pitch: f64, heading: f64) -> Result<(), LinkError>;
    async fn target_direction(&self, frame: &ReferenceFrame, direction: Vec3D<f64>)
    -> Result<(), LinkError>;
    /// Resolves once the attitude controller reports convergence on its target.
    async fn wait_attitude(&self) -> Result<(), LinkError>;
    async fn activate_next_stage(&self) -> Result<(), LinkError>;
    async fn warp_to(&self, ut: f64) -> Result<(), LinkError>;
    async fn add_node(&self, ut: f64, prograde: f64, normal: f64, radial: f64)
    -> Result<NodeHandle, LinkError>;
    async fn remove_node(&self, node: NodeHandle) -> Result<(), LinkError>;
}

/// A full telemetry and actuation connection to one vessel.
pub trait VesselLink: Telemetry + Actuation {}

impl<T: Telemetry + Actuation> VesselLink for T {}
