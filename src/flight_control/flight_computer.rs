use super::{
    guidance_error::GuidanceError,
    orbit::{BodyState, OrbitState, VehicleState},
    vessel_link::{LinkError, VesselLink},
};
use crate::{event, warn};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

/// Thin façade over the vessel collaborator.
///
/// `FlightComputer` never caches: every accessor issues a fresh read, so a
/// value obtained here is valid for the current polling iteration only.
pub struct FlightComputer {
    /// The underlying telemetry/actuation connection.
    link: Arc<dyn VesselLink>,
}

impl FlightComputer {
    /// Creates a new `FlightComputer` on top of `link`.
    ///
    /// # Arguments
    /// - `link`: The vessel collaborator every read and command goes through.
    pub fn new(link: Arc<dyn VesselLink>) -> Self { Self { link } }

    /// Provides the raw collaborator handle.
    pub fn link(&self) -> &Arc<dyn VesselLink> { &self.link }

    /// Reads the collaborator's universal time.
    pub async fn ut(&self) -> Result<f64, LinkError> { self.link.ut().await }

    /// Reads mass, thrust and orbit as one snapshot.
    pub async fn vehicle(&self) -> Result<VehicleState, LinkError> { self.link.vehicle().await }

    /// Reads the current orbit, including the next patch if one is predicted.
    pub async fn orbit(&self) -> Result<OrbitState, LinkError> { self.link.orbit().await }

    /// Reads the body whose sphere of influence the vessel is in.
    pub async fn current_body(&self) -> Result<BodyState, LinkError> {
        self.link.current_body().await
    }

    /// Suspends for `dt` of the collaborator's clock.
    pub async fn idle(&self, dt: Duration) { self.link.idle(dt).await; }

    /// Sets the throttle, clamped to `[0, 1]`.
    ///
    /// # Errors
    /// Propagates the link failure.
    pub async fn set_throttle(&self, throttle: f64) -> Result<(), LinkError> {
        self.link.set_throttle(throttle.clamp(0.0, 1.0)).await
    }

    /// Best-effort throttle cut used on every abort path. Failures are logged
    /// and swallowed, the original error is the one that matters.
    pub async fn cut_throttle(&self) {
        if let Err(err) = self.link.set_throttle(0.0).await {
            warn!("Unable to cut throttle: {err}");
        }
    }

    /// Polls the clock every `poll` until it reaches `target_ut`. The last
    /// suspension is shortened so the clock does not run past the target.
    ///
    /// # Errors
    /// - [`GuidanceError::Cancelled`] if `c_tok` fires at a poll boundary.
    /// - [`GuidanceError::TelemetryUnavailable`] if a clock read fails.
    pub async fn wait_until(
        &self,
        target_ut: f64,
        poll: Duration,
        c_tok: &CancellationToken,
    ) -> Result<(), GuidanceError> {
        loop {
            if c_tok.is_cancelled() {
                return Err(GuidanceError::Cancelled);
            }
            let now = self.link.ut().await?;
            if now >= target_ut {
                return Ok(());
            }
            let step = Duration::try_from_secs_f64(target_ut - now).map_or(poll, |rest| rest.min(poll));
            if step.is_zero() {
                return Ok(());
            }
            event!("Waiting for UT {target_ut:.1}, now {now:.1}");
            self.link.idle(step).await;
        }
    }
}
