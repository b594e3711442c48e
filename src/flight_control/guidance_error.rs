use super::{
    flight_state::{ExecutorState, FlightPhase},
    vessel_link::LinkError,
};
use std::fmt::{Display, Formatter};
use std::time::Duration;
use strum_macros::Display;

/// Non-physical parameters handed to the orbital mechanics routines.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    NonPositiveRadius,
    NonPositiveMu,
    NegativeRadicand,
    NonPositiveMass,
    NonFiniteInput,
    InsufficientThrust,
}

impl std::error::Error for InputError {}

/// Failure taxonomy shared by planning, execution and guidance.
#[derive(Debug, Clone, PartialEq)]
pub enum GuidanceError {
    /// Non-physical input, aborts the current planning step.
    Input(InputError),
    /// Degenerate or hyperbolic transfer, or no forward solution.
    GeometryInfeasible(&'static str),
    /// The attitude controller or a burn never converged within the bound.
    ActuationTimeout(Duration),
    /// The collaborator dropped a read or a command.
    TelemetryUnavailable(LinkError),
    /// An external cancellation request was observed at a poll boundary.
    Cancelled,
}

impl Display for GuidanceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GuidanceError::Input(err) => write!(f, "invalid input: {err}"),
            GuidanceError::GeometryInfeasible(why) => write!(f, "infeasible geometry: {why}"),
            GuidanceError::ActuationTimeout(dt) => {
                write!(f, "actuation did not converge within {}s", dt.as_secs_f64())
            }
            GuidanceError::TelemetryUnavailable(err) => write!(f, "telemetry unavailable: {err}"),
            GuidanceError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for GuidanceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GuidanceError::Input(err) => Some(err),
            GuidanceError::TelemetryUnavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LinkError> for GuidanceError {
    fn from(value: LinkError) -> Self { GuidanceError::TelemetryUnavailable(value) }
}

impl From<InputError> for GuidanceError {
    fn from(value: InputError) -> Self { GuidanceError::Input(value) }
}

/// A maneuver that ended in [`ExecutorState::Aborted`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorAbort {
    /// The state the executor was in when the failure occurred.
    state: ExecutorState,
    cause: GuidanceError,
}

impl ExecutorAbort {
    pub fn new(state: ExecutorState, cause: GuidanceError) -> Self { Self { state, cause } }
    pub fn state(&self) -> ExecutorState { self.state }
    pub fn cause(&self) -> &GuidanceError { &self.cause }
}

impl Display for ExecutorAbort {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "maneuver aborted while {}: {}", self.state, self.cause)
    }
}

impl std::error::Error for ExecutorAbort {}

/// Failure reported by the flight entry point, carrying the phase context.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightError {
    phase: FlightPhase,
    maneuver_state: Option<ExecutorState>,
    cause: GuidanceError,
}

impl FlightError {
    pub fn new(phase: FlightPhase, cause: GuidanceError) -> Self {
        Self { phase, maneuver_state: None, cause }
    }

    pub fn from_abort(phase: FlightPhase, abort: ExecutorAbort) -> Self {
        Self { phase, maneuver_state: Some(abort.state), cause: abort.cause }
    }

    pub fn phase(&self) -> FlightPhase { self.phase }
    pub fn maneuver_state(&self) -> Option<ExecutorState> { self.maneuver_state }
    pub fn cause(&self) -> &GuidanceError { &self.cause }
}

impl Display for FlightError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.maneuver_state {
            Some(state) => write!(f, "{} failed while {state}: {}", self.phase, self.cause),
            None => write!(f, "{} failed: {}", self.phase, self.cause),
        }
    }
}

impl std::error::Error for FlightError {}
