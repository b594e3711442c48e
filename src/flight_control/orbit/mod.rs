mod mechanics;
mod orbit_state;

pub use mechanics::{STANDARD_GRAVITY, burn_duration, delta_v, half_period, vis_viva_speed};
pub use orbit_state::{BodyOrbit, BodyState, OrbitState, VehicleState};
