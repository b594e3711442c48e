//! Onboard guidance core: ascent to orbit, circularization and a two-burn
//! transfer to a moon, driven against a telemetry/actuation collaborator.

pub mod config;
pub mod flight_control;
pub mod keychain;
mod logger;
pub mod mode_control;
pub mod sim;
