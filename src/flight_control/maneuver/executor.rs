use super::maneuver_node::{ManeuverKind, ManeuverNode};
use crate::flight_control::{
    ExecutorState,
    common::Vec3D,
    guidance_error::{ExecutorAbort, GuidanceError},
    vessel_link::{NodeHandle, ReferenceFrame},
};
use crate::keychain::FlightContext;
use crate::{burn, error, event, log, warn};
use std::time::Duration;
use tokio::sync::MutexGuard;

/// Summary of a completed burn.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BurnReport {
    pub kind: ManeuverKind,
    pub planned_delta_v: f64,
    pub planned_duration: f64,
    pub execution_time: f64,
    pub ignition_ut: f64,
    pub cutoff_ut: f64,
}

/// State machine realizing a [`ManeuverNode`] on the vessel.
///
/// ```text
/// Idle -> Warping -> Orienting -> WaitingForWindow -> Burning -> Trimming -> Complete
///   \________\___________\______________\________________\__________\-----> Aborted
/// ```
///
/// Every failure ends in `Aborted` with the throttle forced to zero and the
/// node removed. Failed burns are never retried here, a partial burn changes
/// the orbit and needs a fresh plan.
pub struct ManeuverExecutor {
    ctx: FlightContext,
    state: ExecutorState,
    /// Every state entered during the last execution, in order.
    trace: Vec<ExecutorState>,
}

/// Burn axis in the node frame.
const BURN_AXIS: Vec3D<f64> = Vec3D::new(0.0, 1.0, 0.0);

impl ManeuverExecutor {
    pub fn new(ctx: FlightContext) -> Self {
        Self { ctx, state: ExecutorState::Idle, trace: vec![ExecutorState::Idle] }
    }

    pub fn state(&self) -> ExecutorState { self.state }
    pub fn trace(&self) -> &[ExecutorState] { &self.trace }

    /// Executes `node` to completion.
    ///
    /// The caller proves exclusive use of the vessel by handing in the guard
    /// of the context's maneuver slot.
    ///
    /// # Errors
    /// Returns an [`ExecutorAbort`] naming the state the failure occurred in.
    pub async fn execute(
        &mut self,
        mut node: ManeuverNode,
        _slot: &MutexGuard<'_, ()>,
    ) -> Result<BurnReport, ExecutorAbort> {
        if self.state.is_terminal() {
            self.state = ExecutorState::Idle;
            self.trace = vec![ExecutorState::Idle];
        }
        log!("Executing {node}");
        match self.run(&mut node).await {
            Ok(report) => Ok(report),
            Err(cause) => Err(self.abort(&mut node, cause).await),
        }
    }

    async fn run(&mut self, node: &mut ManeuverNode) -> Result<BurnReport, GuidanceError> {
        let f_comp = self.ctx.f_comp().clone();
        let link = f_comp.link().clone();
        let config = self.ctx.config().clone();
        let c_tok = self.ctx.c_tok().clone();
        let fine_poll = config.fine_poll_dt();

        // Idle: throttle must be zero before the clock may jump
        f_comp.set_throttle(0.0).await?;
        let dv = node.delta_v();
        let handle = link.add_node(node.execution_time(), dv.x(), dv.y(), dv.z()).await?;
        node.register(handle);
        let frame = ReferenceFrame::Node(handle);

        self.advance(ExecutorState::Warping);
        let warp_target = node.burn_start() - config.lead_time;
        let now = f_comp.ut().await?;
        if warp_target > now {
            link.warp_to(warp_target).await?;
        } else {
            warn!("Warp target UT {warp_target:.1} already passed, skipping warp");
        }

        self.advance(ExecutorState::Orienting);
        link.target_direction(&frame, BURN_AXIS).await?;
        let lock_timeout = config.attitude_lock_dt();
        tokio::select! {
            biased;
            () = c_tok.cancelled() => return Err(GuidanceError::Cancelled),
            res = tokio::time::timeout(lock_timeout, link.wait_attitude()) => match res {
                Ok(lock) => lock?,
                Err(_) => return Err(GuidanceError::ActuationTimeout(lock_timeout)),
            }
        }
        self.ctx.announce("Ready to execute burn");

        self.advance(ExecutorState::WaitingForWindow);
        f_comp.wait_until(node.burn_start(), fine_poll, &c_tok).await?;

        self.advance(ExecutorState::Burning);
        if c_tok.is_cancelled() {
            return Err(GuidanceError::Cancelled);
        }
        f_comp.set_throttle(1.0).await?;
        let ignition_ut = f_comp.ut().await?;
        burn!("Ignition at UT {ignition_ut:.1} for {:.2}s", node.burn_duration());
        let hold = node.burn_duration() - config.full_throttle_margin;
        if hold > 0.0 {
            f_comp.wait_until(ignition_ut + hold, fine_poll, &c_tok).await?;
        }

        self.advance(ExecutorState::Trimming);
        self.ctx.announce("Fine tuning");
        f_comp.set_throttle(config.trim_throttle).await?;
        self.trim(handle, &frame, fine_poll).await?;

        f_comp.set_throttle(0.0).await?;
        let cutoff_ut = f_comp.ut().await?;
        if let Some(handle) = node.unregister() {
            link.remove_node(handle).await?;
        }
        self.advance(ExecutorState::Complete);
        burn!("Cutoff at UT {cutoff_ut:.1}, burned {:.2}s", cutoff_ut - ignition_ut);

        Ok(BurnReport {
            kind: node.kind(),
            planned_delta_v: node.prograde_delta_v(),
            planned_duration: node.burn_duration(),
            execution_time: node.execution_time(),
            ignition_ut,
            cutoff_ut,
        })
    }

    /// Polls the remaining burn along the burn axis until it is used up.
    async fn trim(
        &self,
        handle: NodeHandle,
        frame: &ReferenceFrame,
        poll: Duration,
    ) -> Result<(), GuidanceError> {
        let f_comp = self.ctx.f_comp();
        let c_tok = self.ctx.c_tok();
        let max_trim = self.ctx.config().max_trim_duration;
        let trim_start = f_comp.ut().await?;
        loop {
            if c_tok.is_cancelled() {
                return Err(GuidanceError::Cancelled);
            }
            let remaining = f_comp.link().remaining_burn(handle, frame).await?;
            if remaining.y() <= 0.0 {
                return Ok(());
            }
            let now = f_comp.ut().await?;
            if now - trim_start > max_trim {
                return Err(GuidanceError::ActuationTimeout(Duration::from_secs_f64(max_trim)));
            }
            event!("Remaining burn {:.3} m/s", remaining.y());
            f_comp.idle(poll).await;
        }
    }

    async fn abort(&mut self, node: &mut ManeuverNode, cause: GuidanceError) -> ExecutorAbort {
        let failed_in = self.state;
        error!("Maneuver {} aborted while {failed_in}: {cause}", node.kind());
        let f_comp = self.ctx.f_comp();
        f_comp.cut_throttle().await;
        if let Some(handle) = node.unregister() {
            if let Err(err) = f_comp.link().remove_node(handle).await {
                warn!("Unable to remove node #{}: {err}", handle.0);
            }
        }
        self.advance(ExecutorState::Aborted);
        self.ctx.announce("Maneuver aborted");
        ExecutorAbort::new(failed_in, cause)
    }

    fn advance(&mut self, next: ExecutorState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal executor transition {} -> {next}",
            self.state
        );
        log!("Maneuver executor: {} -> {next}", self.state);
        self.state = next;
        self.trace.push(next);
    }
}
