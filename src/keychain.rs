use crate::config::{ConfigError, GuidanceConfig};
use crate::flight_control::{
    FlightComputer, announcer::Announcer, vessel_link::VesselLink,
};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// Explicit context threaded through every guidance component.
///
/// Constructed once at startup, cloning only clones the handles.
#[derive(Clone)]
pub struct FlightContext {
    /// The flight computer wrapping the vessel collaborator.
    f_comp: Arc<FlightComputer>,
    /// Sink for phase-transition callouts.
    announcer: Arc<dyn Announcer>,
    /// Tuning constants, immutable for the run.
    config: Arc<GuidanceConfig>,
    /// External abort request, checked at every poll boundary.
    c_tok: CancellationToken,
    /// Held from planning through the terminal executor state, so only one
    /// maneuver is ever in flight.
    maneuver_slot: Arc<Mutex<()>>,
}

impl FlightContext {
    /// Creates the context for one flight.
    ///
    /// # Arguments
    /// - `link`: The telemetry and actuation connection to the vessel.
    /// - `announcer`: Sink for the crew callouts.
    /// - `config`: The guidance constants, validated before use.
    /// - `c_tok`: Token aborting the flight at the next poll boundary.
    ///
    /// # Returns
    /// A new `FlightContext` with a free maneuver slot.
    ///
    /// # Errors
    /// [`ConfigError::InvalidValue`] if `config` fails [`GuidanceConfig::validate`].
    pub fn new(
        link: Arc<dyn VesselLink>,
        announcer: Arc<dyn Announcer>,
        config: GuidanceConfig,
        c_tok: CancellationToken,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            f_comp: Arc::new(FlightComputer::new(link)),
            announcer,
            config: Arc::new(config),
            c_tok,
            maneuver_slot: Arc::new(Mutex::new(())),
        })
    }

    /// Provides a reference to the flight computer.
    pub fn f_comp(&self) -> &Arc<FlightComputer> { &self.f_comp }

    /// Provides the validated guidance constants.
    pub fn config(&self) -> &GuidanceConfig { &self.config }

    /// Provides the flight-wide cancellation token.
    pub fn c_tok(&self) -> &CancellationToken { &self.c_tok }

    /// Forwards a callout to the announcer.
    pub fn announce(&self, text: &str) { self.announcer.announce(text); }

    /// Waits for exclusive use of the maneuver slot.
    ///
    /// # Returns
    /// The guard proving that no other maneuver is being planned or flown.
    pub async fn lock_maneuver_slot(&self) -> MutexGuard<'_, ()> { self.maneuver_slot.lock().await }
}
