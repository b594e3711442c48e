use crate::flight_control::{
    FlightPhase,
    common::Vec3D,
    guidance_error::GuidanceError,
    vessel_link::{NodeHandle, ReferenceFrame},
};
use std::fmt::{Display, Formatter};
use strum_macros::{Display, EnumIter};

/// The planning algorithm a node was produced by.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Display, EnumIter, serde::Serialize)]
pub enum ManeuverKind {
    Circularization,
    Departure,
    MidCourse,
}

impl From<ManeuverKind> for FlightPhase {
    fn from(kind: ManeuverKind) -> Self {
        match kind {
            ManeuverKind::Circularization => FlightPhase::Circularization,
            ManeuverKind::Departure => FlightPhase::Departure,
            ManeuverKind::MidCourse => FlightPhase::MidCourse,
        }
    }
}

/// A planned velocity change at a future point in simulated time.
///
/// Created by the [`NodeScheduler`](super::NodeScheduler), exclusively owned
/// by the executor consuming it. The handle is only set while the node is
/// registered with the actuation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ManeuverNode {
    kind: ManeuverKind,
    /// Absolute universal time of the burn centre.
    execution_time: f64,
    /// Velocity change as (prograde, normal, radial).
    delta_v: Vec3D<f64>,
    /// Planned full-throttle burn time for `delta_v`.
    burn_duration: f64,
    handle: Option<NodeHandle>,
}

impl ManeuverNode {
    /// Creates a purely prograde/retrograde node.
    pub fn prograde(kind: ManeuverKind, execution_time: f64, delta_v: f64, burn_duration: f64) -> Self {
        Self {
            kind,
            execution_time,
            delta_v: Vec3D::new(delta_v, 0.0, 0.0),
            burn_duration,
            handle: None,
        }
    }

    pub fn kind(&self) -> ManeuverKind { self.kind }
    pub fn execution_time(&self) -> f64 { self.execution_time }
    pub fn delta_v(&self) -> Vec3D<f64> { self.delta_v }
    pub fn prograde_delta_v(&self) -> f64 { self.delta_v.x() }
    pub fn burn_duration(&self) -> f64 { self.burn_duration }
    pub fn handle(&self) -> Option<NodeHandle> { self.handle }

    /// Universal time at which the burn has to start so that it is centred on
    /// the execution time.
    pub fn burn_start(&self) -> f64 { self.execution_time - self.burn_duration / 2.0 }

    /// Frame the burn is steered in, available once the node is registered.
    pub fn reference_frame(&self) -> Option<ReferenceFrame> { self.handle.map(ReferenceFrame::Node) }

    pub(super) fn register(&mut self, handle: NodeHandle) { self.handle = Some(handle); }
    pub(super) fn unregister(&mut self) -> Option<NodeHandle> { self.handle.take() }
}

impl Display for ManeuverNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} node at UT {:.1}: dv {:.2} m/s, burn {:.2}s",
            self.kind,
            self.execution_time,
            self.prograde_delta_v(),
            self.burn_duration
        )
    }
}

/// Ordered production steps of a multi-phase transfer.
///
/// Every admitted node must lie strictly after the current time and after the
/// previously admitted node. Nodes are admitted one at a time, right before
/// their burn, from freshly planned values.
#[derive(Debug, Clone)]
pub struct ManeuverPlan {
    steps: Vec<ManeuverKind>,
    admitted: Vec<(ManeuverKind, f64)>,
}

impl ManeuverPlan {
    pub fn new(steps: Vec<ManeuverKind>) -> Self { Self { steps, admitted: Vec::new() } }

    /// The two-burn interplanetary transfer.
    pub fn transfer() -> Self { Self::new(vec![ManeuverKind::Departure, ManeuverKind::MidCourse]) }

    pub fn steps(&self) -> &[ManeuverKind] { &self.steps }

    /// The next step that has not been admitted yet.
    pub fn next_step(&self) -> Option<ManeuverKind> { self.steps.get(self.admitted.len()).copied() }

    pub fn is_complete(&self) -> bool { self.admitted.len() == self.steps.len() }

    /// Validates a freshly planned node against the plan ordering.
    ///
    /// # Errors
    /// [`GuidanceError::GeometryInfeasible`] if the node is of the wrong kind,
    /// lies in the past, or does not follow the previously admitted node.
    pub fn admit(&mut self, node: &ManeuverNode, now: f64) -> Result<(), GuidanceError> {
        if self.next_step() != Some(node.kind()) {
            return Err(GuidanceError::GeometryInfeasible("maneuver out of plan order"));
        }
        if !node.execution_time().is_finite() || node.execution_time() <= now {
            return Err(GuidanceError::GeometryInfeasible("maneuver scheduled in the past"));
        }
        if let Some((_, last)) = self.admitted.last() {
            if node.execution_time() <= *last {
                return Err(GuidanceError::GeometryInfeasible(
                    "maneuver does not follow the previous node",
                ));
            }
        }
        self.admitted.push((node.kind(), node.execution_time()));
        Ok(())
    }
}
