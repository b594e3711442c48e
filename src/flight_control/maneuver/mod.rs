mod executor;
mod maneuver_node;
mod node_scheduler;
#[cfg(test)]
mod tests;

pub use executor::{BurnReport, ManeuverExecutor};
pub use maneuver_node::{ManeuverKind, ManeuverNode, ManeuverPlan};
pub use node_scheduler::{NodeScheduler, departure_angle, predict_target_angle};
