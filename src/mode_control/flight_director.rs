use super::{
    ascent_mode::{AscentGuidance, AscentOutcome},
    transfer_mode::TransferPlanner,
};
use crate::config::MissionConfig;
use crate::flight_control::{
    FlightError, FlightPhase, GuidanceError,
    maneuver::{BurnReport, ManeuverExecutor, ManeuverNode, NodeScheduler},
    orbit::OrbitState,
};
use crate::keychain::FlightContext;
use crate::{error, info};

/// Result of a successful flight.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FlightReport {
    pub target_body: String,
    pub ascent: AscentOutcome,
    /// Every executed burn in order.
    pub burns: Vec<BurnReport>,
    pub final_orbit: OrbitState,
}

/// Caller-facing entry point: ascent to orbit, circularization and the
/// transfer to the target body.
pub struct FlightDirector {
    ctx: FlightContext,
    target_apoapsis: f64,
    target_body: String,
}

impl FlightDirector {
    pub fn new(ctx: FlightContext, mission: &MissionConfig) -> Self {
        Self {
            ctx,
            target_apoapsis: mission.target_apoapsis_altitude,
            target_body: mission.target_body.clone(),
        }
    }

    /// Runs the whole flight.
    ///
    /// # Errors
    /// A [`FlightError`] carrying the phase and, for burns, the executor
    /// state in which the flight failed.
    pub async fn run(&self) -> Result<FlightReport, FlightError> {
        let result = self.fly().await;
        if let Err(err) = &result {
            error!("Flight failed: {err}");
            self.ctx.f_comp().cut_throttle().await;
        }
        result
    }

    async fn fly(&self) -> Result<FlightReport, FlightError> {
        self.phase(FlightPhase::Launch);
        self.launch().await.map_err(|e| FlightError::new(FlightPhase::Launch, e))?;

        self.phase(FlightPhase::Ascent);
        self.ctx.announce("Starting gravity turn");
        let ascent = AscentGuidance::new(self.ctx.clone(), self.target_apoapsis)
            .run()
            .await
            .map_err(|e| FlightError::new(FlightPhase::Ascent, e))?;
        self.ctx.announce("Target apoapsis reached");

        self.phase(FlightPhase::Circularization);
        self.ctx.announce("Starting circularization burn");
        let circularization = self.circularize().await?;

        self.phase(FlightPhase::Staging);
        self.stage().await.map_err(|e| FlightError::new(FlightPhase::Staging, e))?;

        self.phase(FlightPhase::Departure);
        self.ctx.announce(&format!("Starting transfer to {}", self.target_body));
        let mut burns = vec![circularization];
        burns.extend(TransferPlanner::new(self.ctx.clone(), &self.target_body).run().await?);

        let final_orbit = self
            .ctx
            .f_comp()
            .orbit()
            .await
            .map_err(|e| FlightError::new(FlightPhase::MidCourse, e.into()))?;
        info!(
            "Flight complete around {}: periapsis {:.0} m, apoapsis {:.0} m",
            final_orbit.body, final_orbit.periapsis_altitude, final_orbit.apoapsis_altitude
        );
        Ok(FlightReport { target_body: self.target_body.clone(), ascent, burns, final_orbit })
    }

    /// Configures the autopilot on the pad and lights the first stage.
    async fn launch(&self) -> Result<(), GuidanceError> {
        let config = self.ctx.config();
        let f_comp = self.ctx.f_comp();
        let link = f_comp.link();
        link.target_pitch_and_heading(90.0, 90.0).await?;
        link.engage_autopilot().await?;
        f_comp.set_throttle(0.0).await?;
        link.set_rcs(false).await?;
        link.set_sas(false).await?;
        let (kp, ki, kd) = config.autopilot_gains;
        link.set_autopilot_gains(kp, ki, kd).await?;
        self.check_cancelled()?;

        self.ctx.announce("Ignition");
        link.activate_next_stage().await?;
        f_comp.set_throttle(config.launch_throttle).await?;
        f_comp.idle(config.settle_dt()).await;
        Ok(())
    }

    async fn circularize(&self) -> Result<BurnReport, FlightError> {
        let phase = FlightPhase::Circularization;
        let slot = self.ctx.lock_maneuver_slot().await;
        let node = self.plan_circularization().await.map_err(|e| FlightError::new(phase, e))?;
        info!("Planned {node}");
        ManeuverExecutor::new(self.ctx.clone())
            .execute(node, &slot)
            .await
            .map_err(|abort| FlightError::from_abort(phase, abort))
    }

    async fn plan_circularization(&self) -> Result<ManeuverNode, GuidanceError> {
        self.check_cancelled()?;
        let f_comp = self.ctx.f_comp();
        let now = f_comp.ut().await?;
        let vehicle = f_comp.vehicle().await?;
        let body = f_comp.current_body().await?;
        NodeScheduler::new(self.ctx.config().lead_angle).plan_circularization(now, &vehicle, &body)
    }

    /// Drops the spent stage and lets the vehicle settle.
    async fn stage(&self) -> Result<(), GuidanceError> {
        self.check_cancelled()?;
        let f_comp = self.ctx.f_comp();
        f_comp.link().activate_next_stage().await?;
        f_comp.idle(self.ctx.config().settle_dt()).await;
        Ok(())
    }

    fn phase(&self, phase: FlightPhase) { info!("Entering flight phase {phase}"); }

    fn check_cancelled(&self) -> Result<(), GuidanceError> {
        if self.ctx.c_tok().is_cancelled() { Err(GuidanceError::Cancelled) } else { Ok(()) }
    }
}
