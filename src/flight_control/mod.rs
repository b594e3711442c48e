pub mod announcer;
pub mod common;
mod flight_computer;
mod flight_state;
mod guidance_error;
pub mod maneuver;
pub mod orbit;
pub mod vessel_link;

pub use flight_computer::FlightComputer;
pub use flight_state::{ExecutorState, FlightPhase};
pub use guidance_error::{ExecutorAbort, FlightError, GuidanceError, InputError};
