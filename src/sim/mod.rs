mod kepler;
#[cfg(test)]
pub(crate) mod mock_link;
mod sim_body;
mod sim_vessel;

pub use kepler::orbit_from_state;
pub use sim_body::{SimBody, SimSystem};
pub use sim_vessel::{SimEngine, SimVehicle, SimVessel};
