use crate::flight_control::{
    FlightError, FlightPhase, GuidanceError,
    maneuver::{BurnReport, ManeuverExecutor, ManeuverKind, ManeuverNode, ManeuverPlan, NodeScheduler},
    vessel_link::ReferenceFrame,
};
use crate::keychain::FlightContext;
use crate::{info, log};

/// Two-burn transfer to a moon of the current body: Hohmann departure,
/// then the correction at the encounter periapsis.
///
/// Each burn is planned from telemetry read right before it, never from a
/// plan made before the previous burn.
pub struct TransferPlanner {
    ctx: FlightContext,
    scheduler: NodeScheduler,
    target: String,
}

impl TransferPlanner {
    pub fn new(ctx: FlightContext, target: &str) -> Self {
        let scheduler = NodeScheduler::new(ctx.config().lead_angle);
        Self { ctx, scheduler, target: target.to_string() }
    }

    /// Flies the complete transfer.
    ///
    /// # Errors
    /// A [`FlightError`] tagged with the departure or mid-course phase.
    pub async fn run(&self) -> Result<Vec<BurnReport>, FlightError> {
        let mut plan = ManeuverPlan::transfer();
        let mut executor = ManeuverExecutor::new(self.ctx.clone());
        let mut reports = Vec::with_capacity(plan.steps().len());

        while let Some(step) = plan.next_step() {
            let phase = FlightPhase::from(step);
            if self.ctx.c_tok().is_cancelled() {
                return Err(FlightError::new(phase, GuidanceError::Cancelled));
            }
            let slot = self.ctx.lock_maneuver_slot().await;
            let (node, now) = self.plan(step).await.map_err(|e| FlightError::new(phase, e))?;
            plan.admit(&node, now).map_err(|e| FlightError::new(phase, e))?;
            info!("Planned {node}");
            let report = executor
                .execute(node, &slot)
                .await
                .map_err(|abort| FlightError::from_abort(phase, abort))?;
            log!("{step} burn complete after {:.1}s", report.cutoff_ut - report.ignition_ut);
            reports.push(report);
        }
        Ok(reports)
    }

    async fn plan(&self, step: ManeuverKind) -> Result<(ManeuverNode, f64), GuidanceError> {
        let f_comp = self.ctx.f_comp();
        let link = f_comp.link();
        let now = f_comp.ut().await?;
        let vehicle = f_comp.vehicle().await?;
        let target = link.body(&self.target).await?;
        let node = match step {
            ManeuverKind::Departure => {
                let primary = f_comp.current_body().await?;
                let frame = ReferenceFrame::BodyNonRotating(primary.name.clone());
                let vessel_angle = link.vessel_position(&frame).await?.planar_angle();
                let target_angle = link.body_position(&self.target, &frame).await?.planar_angle();
                self.scheduler.plan_hohmann_departure(
                    now,
                    &vehicle,
                    &primary,
                    &target,
                    vessel_angle,
                    target_angle,
                )?
            }
            ManeuverKind::MidCourse => self.scheduler.plan_mid_course(now, &vehicle, &target)?,
            ManeuverKind::Circularization => {
                let body = f_comp.current_body().await?;
                self.scheduler.plan_circularization(now, &vehicle, &body)?
            }
        };
        Ok((node, now))
    }
}
