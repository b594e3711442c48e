use crate::config::GuidanceConfig;
use crate::flight_control::{GuidanceError, common::interpolate};
use crate::keychain::FlightContext;
use crate::{event, info};

/// Heading of the whole ascent, due east.
const ASCENT_HEADING: f64 = 90.0;

/// Outcome of a powered ascent.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AscentOutcome {
    /// Whether the boosters were separated during the ascent.
    pub staged: bool,
    /// Number of pitch commands issued by the gravity turn.
    pub pitch_commands: usize,
    pub apoapsis_altitude: f64,
}

/// Closed-loop gravity turn with booster staging and two-step apoapsis cutoff.
pub struct AscentGuidance {
    ctx: FlightContext,
    target_apoapsis: f64,
}

impl AscentGuidance {
    pub fn new(ctx: FlightContext, target_apoapsis: f64) -> Self { Self { ctx, target_apoapsis } }

    /// Pitch above the horizon in degrees for a given altitude: vertical below
    /// the turn start, linear down to horizontal at the turn end, horizontal
    /// above.
    pub fn pitch_for_altitude(config: &GuidanceConfig, altitude: f64) -> f64 {
        interpolate(config.turn_start_altitude, config.turn_end_altitude, 90.0, 0.0, altitude)
    }

    /// Flies the ascent until the apoapsis reaches the target altitude.
    ///
    /// The control loop exits once the apoapsis crosses the coarse cutoff
    /// fraction of the target. The remainder is flown at reduced throttle,
    /// then the engines are cut.
    ///
    /// # Errors
    /// - [`GuidanceError::TelemetryUnavailable`] on a dropped read or command.
    /// - [`GuidanceError::Cancelled`] if the flight is cancelled.
    /// - [`GuidanceError::GeometryInfeasible`] if the vehicle runs out of
    ///   thrust before the target is reached.
    pub async fn run(&self) -> Result<AscentOutcome, GuidanceError> {
        let config = self.ctx.config();
        let f_comp = self.ctx.f_comp();
        let link = f_comp.link();
        let fine_poll = config.fine_poll_dt();

        let mut last_pitch = 90.0;
        let mut turn_end_held = false;
        let mut boosters_attached = true;
        let mut pitch_commands = 0;

        loop {
            self.check_cancelled()?;
            let altitude = link.mean_altitude().await?;
            if altitude > config.turn_start_altitude {
                let pitch = Self::pitch_for_altitude(config, altitude);
                let hold_turn_end = altitude >= config.turn_end_altitude && !turn_end_held;
                if hold_turn_end || (pitch - last_pitch).abs() > config.pitch_hysteresis {
                    link.target_pitch_and_heading(pitch, ASCENT_HEADING).await?;
                    event!("Pitch {pitch:.1} deg at {altitude:.0} m");
                    last_pitch = pitch;
                    pitch_commands += 1;
                    turn_end_held |= altitude >= config.turn_end_altitude;
                }
            }

            if boosters_attached
                && link.resource_amount(&config.booster_resource).await? < config.staging_threshold
            {
                self.ctx.announce("Booster separation");
                link.activate_next_stage().await?;
                boosters_attached = false;
                self.ramp_throttle().await?;
            }

            if self.apoapsis_reached(config.coarse_cutoff_fraction).await? {
                self.ctx.announce("Approaching target apoapsis");
                break;
            }
            f_comp.idle(fine_poll).await;
        }

        f_comp.set_throttle(config.fine_cutoff_throttle).await?;
        while !self.apoapsis_reached(1.0).await? {
            self.check_cancelled()?;
            f_comp.idle(fine_poll).await;
        }
        f_comp.set_throttle(0.0).await?;
        f_comp.idle(config.coarse_poll_dt()).await;

        let apoapsis_altitude = f_comp.orbit().await?.apoapsis_altitude;
        info!("Ascent complete, apoapsis at {apoapsis_altitude:.0} m");
        Ok(AscentOutcome { staged: !boosters_attached, pitch_commands, apoapsis_altitude })
    }

    /// Raises the throttle to full in fixed steps, one step per fine poll.
    async fn ramp_throttle(&self) -> Result<(), GuidanceError> {
        let config = self.ctx.config();
        let f_comp = self.ctx.f_comp();
        let mut throttle = f_comp.link().throttle().await?;
        while throttle < 1.0 {
            self.check_cancelled()?;
            throttle = (throttle + config.throttle_ramp_step).min(1.0);
            f_comp.set_throttle(throttle).await?;
            f_comp.idle(config.fine_poll_dt()).await;
        }
        Ok(())
    }

    async fn apoapsis_reached(&self, fraction: f64) -> Result<bool, GuidanceError> {
        let vehicle = self.ctx.f_comp().vehicle().await?;
        if vehicle.orbit.apoapsis_altitude >= self.target_apoapsis * fraction {
            return Ok(true);
        }
        if vehicle.available_thrust <= 0.0 {
            return Err(GuidanceError::GeometryInfeasible("out of thrust below the target apoapsis"));
        }
        Ok(false)
    }

    fn check_cancelled(&self) -> Result<(), GuidanceError> {
        if self.ctx.c_tok().is_cancelled() { Err(GuidanceError::Cancelled) } else { Ok(()) }
    }
}
