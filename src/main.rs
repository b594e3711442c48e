use itertools::Itertools;
use skyward_ob::{
    config::MissionConfig,
    error,
    flight_control::announcer::LogAnnouncer,
    info,
    keychain::FlightContext,
    mode_control::FlightDirector,
    sim::{SimSystem, SimVehicle, SimVessel},
    warn,
};
use std::{process::ExitCode, sync::Arc};
use tokio_util::sync::CancellationToken;

/// Home world the vessel launches from.
const LAUNCH_BODY: &str = "Kerbin";
/// Angle of the Mun around Kerbin at launch.
const MUN_PHASE: f64 = 1.0;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let mission = match MissionConfig::load() {
        Ok(mission) => mission,
        Err(err) => {
            error!("Invalid mission configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    let vessel = match SimVessel::on_launchpad(
        SimSystem::kerbin_mun(MUN_PHASE),
        LAUNCH_BODY,
        SimVehicle::demo_rocket(),
    ) {
        Ok(vessel) => vessel,
        Err(err) => {
            error!("Unable to set up the vessel: {err}");
            return ExitCode::FAILURE;
        }
    };

    let c_tok = CancellationToken::new();
    let ctrl_c_tok = c_tok.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, aborting flight at the next poll");
            ctrl_c_tok.cancel();
        }
    });

    info!(
        "Mission: apoapsis {:.0} m above {LAUNCH_BODY}, then transfer to {}",
        mission.target_apoapsis_altitude, mission.target_body
    );
    let context = match FlightContext::new(
        Arc::new(vessel),
        Arc::new(LogAnnouncer::new()),
        mission.guidance.clone(),
        c_tok,
    ) {
        Ok(context) => context,
        Err(err) => {
            error!("Invalid guidance configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    match FlightDirector::new(context, &mission).run().await {
        Ok(report) => {
            let burns = report
                .burns
                .iter()
                .map(|b| format!("{} {:.1} m/s in {:.1}s", b.kind, b.planned_delta_v, b.cutoff_ut - b.ignition_ut))
                .join(", ");
            info!("Burns: {burns}");
            info!(
                "Final orbit around {}: {:.0} m x {:.0} m",
                report.final_orbit.body, report.final_orbit.periapsis_altitude, report.final_orbit.apoapsis_altitude
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("Mission failed: {err}");
            ExitCode::FAILURE
        }
    }
}
