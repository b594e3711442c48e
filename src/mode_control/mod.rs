//! Flight modes built on top of the maneuver layer: the powered ascent, the
//! interplanetary transfer and the director sequencing them into a flight.

mod ascent_mode;
mod flight_director;
mod transfer_mode;

pub use crate::flight_control::FlightPhase;
pub use ascent_mode::{AscentGuidance, AscentOutcome};
pub use flight_director::{FlightDirector, FlightReport};
pub use transfer_mode::TransferPlanner;
