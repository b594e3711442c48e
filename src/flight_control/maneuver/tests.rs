use super::{ManeuverExecutor, ManeuverKind, ManeuverNode, ManeuverPlan, NodeScheduler, departure_angle, predict_target_angle};
use crate::config::GuidanceConfig;
use crate::flight_control::{
    ExecutorState, GuidanceError,
    announcer::ChannelAnnouncer,
    common::Vec3D,
    vessel_link::{LinkError, NodeHandle, ReferenceFrame},
};
use crate::keychain::FlightContext;
use crate::sim::mock_link::{MockLink, MockState};
use rand::{Rng, rng};
use std::{
    f64::consts::{PI, TAU},
    sync::Arc,
    time::Duration,
};
use strum::IntoEnumIterator;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

fn context(state: MockState, c_tok: CancellationToken) -> (Arc<MockLink>, FlightContext, UnboundedReceiver<String>) {
    let link = Arc::new(MockLink::new(state));
    let (announcer, rx) = ChannelAnnouncer::new();
    let ctx = FlightContext::new(link.clone(), Arc::new(announcer), GuidanceConfig::default(), c_tok).unwrap();
    (link, ctx, rx)
}

fn drain(rx: &mut UnboundedReceiver<String>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

fn circularization_node() -> ManeuverNode { ManeuverNode::prograde(ManeuverKind::Circularization, 100.0, 60.0, 5.0) }

#[test]
fn test_terminal_states_have_no_transitions() {
    for from in ExecutorState::iter() {
        for to in ExecutorState::iter() {
            if from.is_terminal() {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
        if !from.is_terminal() {
            assert!(from.can_transition_to(ExecutorState::Aborted), "{from} cannot abort");
        }
    }
    assert!(!ExecutorState::Idle.can_transition_to(ExecutorState::Burning));
    assert!(!ExecutorState::Trimming.can_transition_to(ExecutorState::Burning));
}

#[test]
fn test_node_burn_is_centred() {
    let node = circularization_node();
    assert_eq!(node.burn_start(), 97.5);
    assert_eq!(node.handle(), None);
    assert_eq!(node.reference_frame(), None);
    assert_eq!(node.delta_v(), Vec3D::new(60.0, 0.0, 0.0));
}

#[test]
fn test_plan_admits_in_order() {
    let mut plan = ManeuverPlan::transfer();
    assert_eq!(plan.next_step(), Some(ManeuverKind::Departure));

    let mid_course = ManeuverNode::prograde(ManeuverKind::MidCourse, 500.0, -20.0, 2.0);
    assert!(matches!(plan.admit(&mid_course, 0.0), Err(GuidanceError::GeometryInfeasible(_))));

    let departure = ManeuverNode::prograde(ManeuverKind::Departure, 300.0, 800.0, 60.0);
    assert!(plan.admit(&departure, 300.0).is_err());
    assert!(plan.admit(&departure, 100.0).is_ok());
    assert_eq!(plan.next_step(), Some(ManeuverKind::MidCourse));

    let early = ManeuverNode::prograde(ManeuverKind::MidCourse, 250.0, -20.0, 2.0);
    assert!(plan.admit(&early, 200.0).is_err());
    assert!(!plan.is_complete());
    assert!(plan.admit(&mid_course, 400.0).is_ok());
    assert!(plan.is_complete());
    assert_eq!(plan.next_step(), None);
}

#[test]
fn test_plan_rejects_non_finite_time() {
    let mut plan = ManeuverPlan::new(vec![ManeuverKind::Circularization]);
    let node = ManeuverNode::prograde(ManeuverKind::Circularization, f64::NAN, 10.0, 1.0);
    assert!(plan.admit(&node, 0.0).is_err());
}

#[test]
fn test_plan_circularization_at_apoapsis() {
    let state = MockState::new();
    let body = state.bodies["Pebble"].clone();
    let vehicle = state.vehicle.clone();
    let node = NodeScheduler::new(0.1).plan_circularization(50.0, &vehicle, &body).unwrap();

    assert_eq!(node.kind(), ManeuverKind::Circularization);
    assert!((node.execution_time() - (50.0 + vehicle.orbit.time_to_apoapsis)).abs() < 1e-9);
    let v_apo = (3.5e12_f64 * (2.0 / 100_000.0 - 1.0 / 90_000.0)).sqrt();
    let v_circ = (3.5e12 / 100_000.0f64).sqrt();
    assert!((node.prograde_delta_v() - (v_circ - v_apo)).abs() < 1e-6);
    assert!(node.burn_duration() > 0.0);
}

#[test]
fn test_plan_circularization_rejects_open_orbit() {
    let state = MockState::new();
    let body = state.bodies["Pebble"].clone();
    let mut vehicle = state.vehicle.clone();
    vehicle.orbit.apoapsis_radius = f64::INFINITY;
    vehicle.orbit.eccentricity = 1.2;
    vehicle.orbit.time_to_apoapsis = f64::INFINITY;
    let res = NodeScheduler::new(0.1).plan_circularization(0.0, &vehicle, &body);
    assert!(matches!(res, Err(GuidanceError::GeometryInfeasible(_))));
}

#[test]
fn test_plan_hohmann_departure_lies_ahead() {
    let mut rng = rng();
    let primary = MockState::body("Kerbin", 3.5316e12, 600_000.0);
    let moon = MockState::moon("Mun", 6.5138e10, 200_000.0, &primary, 1.2e7, 2.43e6);
    let mut vehicle = MockState::new().vehicle;
    vehicle.orbit = MockState::closed_orbit(&primary, 750_000.0, 750_000.0);
    let scheduler = NodeScheduler::new(0.1);

    for _ in 0..1_000 {
        let vessel_angle = rng.random_range(-PI..PI);
        let target_angle = rng.random_range(-PI..PI);
        let node = scheduler
            .plan_hohmann_departure(1_000.0, &vehicle, &primary, &moon, vessel_angle, target_angle)
            .unwrap();
        assert!(node.execution_time() > 1_000.0);
        assert!(node.execution_time() <= 1_000.0 + vehicle.orbit.period + 1e-6);
        assert!(node.prograde_delta_v() > 0.0);
    }
}

#[test]
fn test_plan_hohmann_departure_requires_sibling_target() {
    let primary = MockState::body("Kerbin", 3.5316e12, 600_000.0);
    let other = MockState::body("Sun", 1.1723e18, 2.616e8);
    let stray = MockState::moon("Minmus", 1.7658e9, 60_000.0, &other, 4.7e7, 2.247e6);
    let mut vehicle = MockState::new().vehicle;
    vehicle.orbit = MockState::closed_orbit(&primary, 750_000.0, 700_000.0);
    let res = NodeScheduler::new(0.1).plan_hohmann_departure(0.0, &vehicle, &primary, &stray, 0.0, 1.0);
    assert!(matches!(res, Err(GuidanceError::GeometryInfeasible(_))));
}

#[test]
fn test_target_angle_prediction_and_departure_window() {
    let mut rng = rng();
    let omega = TAU / 1.2e7;
    for _ in 0..10_000 {
        let vessel_angle = rng.random_range(-PI..PI);
        let predicted = predict_target_angle(0.0, 5.0e5, omega);
        assert!(predicted > -PI && predicted <= PI);
        let start = departure_angle(predicted, 0.1, vessel_angle).unwrap();
        assert!(start > vessel_angle);
        assert!(start <= vessel_angle + TAU + 1e-9);
    }
    assert!(departure_angle(f64::NAN, 0.1, 0.0).is_none());
}

#[test]
fn test_plan_mid_course_captures_at_periapsis() {
    let primary = MockState::body("Kerbin", 3.5316e12, 600_000.0);
    let moon = MockState::moon("Mun", 6.5138e10, 200_000.0, &primary, 1.2e7, 2.43e6);
    let mut vehicle = MockState::new().vehicle;
    vehicle.orbit = MockState::closed_orbit(&primary, 1.2e7, 750_000.0);
    let scheduler = NodeScheduler::new(0.1);
    assert!(matches!(
        scheduler.plan_mid_course(0.0, &vehicle, &moon),
        Err(GuidanceError::GeometryInfeasible(_))
    ));

    let mut encounter = MockState::closed_orbit(&moon, 250_000.0, 250_000.0);
    encounter.semi_major_axis = -400_000.0;
    encounter.eccentricity = 1.6;
    encounter.time_to_periapsis = 3_000.0;
    vehicle.orbit.time_to_soi_change = Some(20_000.0);
    vehicle.orbit.next_orbit = Some(Box::new(encounter));

    let node = scheduler.plan_mid_course(100.0, &vehicle, &moon).unwrap();
    assert_eq!(node.kind(), ManeuverKind::MidCourse);
    assert!((node.execution_time() - 23_100.0).abs() < 1e-9);
    assert!(node.prograde_delta_v() < 0.0);
    assert!(node.burn_duration() > 0.0);

    let wrong_target = MockState::moon("Minmus", 1.7658e9, 60_000.0, &primary, 4.7e7, 2.247e6);
    assert!(scheduler.plan_mid_course(100.0, &vehicle, &wrong_target).is_err());
}

#[test]
fn test_plan_mid_course_rejects_impact() {
    let primary = MockState::body("Kerbin", 3.5316e12, 600_000.0);
    let moon = MockState::moon("Mun", 6.5138e10, 200_000.0, &primary, 1.2e7, 2.43e6);
    let mut vehicle = MockState::new().vehicle;
    vehicle.orbit = MockState::closed_orbit(&primary, 1.2e7, 750_000.0);
    vehicle.orbit.time_to_soi_change = Some(20_000.0);
    let scheduler = NodeScheduler::new(0.1);

    for periapsis in [0.0, 150_000.0, 200_000.0, f64::NAN] {
        let mut encounter = MockState::closed_orbit(&moon, 250_000.0, periapsis);
        encounter.semi_major_axis = -400_000.0;
        encounter.time_to_periapsis = 3_000.0;
        vehicle.orbit.next_orbit = Some(Box::new(encounter));
        assert_eq!(
            scheduler.plan_mid_course(100.0, &vehicle, &moon),
            Err(GuidanceError::GeometryInfeasible("encounter periapsis below the target surface")),
            "periapsis radius {periapsis}"
        );
    }
}

#[tokio::test]
async fn test_executor_completes_burn() {
    let (link, ctx, mut rx) = context(MockState::new(), CancellationToken::new());
    let mut executor = ManeuverExecutor::new(ctx.clone());
    let slot = ctx.lock_maneuver_slot().await;
    let report = executor.execute(circularization_node(), &slot).await.unwrap();

    assert_eq!(
        executor.trace(),
        &[
            ExecutorState::Idle,
            ExecutorState::Warping,
            ExecutorState::Orienting,
            ExecutorState::WaitingForWindow,
            ExecutorState::Burning,
            ExecutorState::Trimming,
            ExecutorState::Complete,
        ]
    );
    assert_eq!(report.kind, ManeuverKind::Circularization);
    // the window wait stops on the burn start instead of the next poll
    assert!((report.ignition_ut - 97.5).abs() < 1e-6, "ignition at {}", report.ignition_ut);
    assert!(report.cutoff_ut - report.ignition_ut > 4.5);

    link.with(|st| {
        assert_eq!(st.throttle, 0.0);
        assert!(st.nodes.is_empty());
        assert_eq!(st.removed_nodes, vec![NodeHandle(1)]);
        assert_eq!(st.warps, vec![87.5]);
        assert_eq!(st.directions, vec![(ReferenceFrame::Node(NodeHandle(1)), Vec3D::new(0.0, 1.0, 0.0))]);
        assert!(st.throttle_log.contains(&1.0));
        assert!(st.throttle_log.contains(&0.05));
    })
    .await;
    let calls = drain(&mut rx);
    assert_eq!(calls, vec!["Ready to execute burn".to_string(), "Fine tuning".to_string()]);
}

#[tokio::test]
async fn test_executor_skips_warp_into_the_past() {
    let mut state = MockState::new();
    state.ut = 95.0;
    let (link, ctx, _rx) = context(state, CancellationToken::new());
    let mut executor = ManeuverExecutor::new(ctx.clone());
    let slot = ctx.lock_maneuver_slot().await;
    executor.execute(circularization_node(), &slot).await.unwrap();
    assert_eq!(executor.state(), ExecutorState::Complete);
    link.with(|st| assert!(st.warps.is_empty())).await;
}

#[tokio::test]
async fn test_executor_aborts_on_telemetry_loss_while_burning() {
    let mut state = MockState::new();
    state.fail_ut_at_full_throttle = true;
    let (link, ctx, mut rx) = context(state, CancellationToken::new());
    let mut executor = ManeuverExecutor::new(ctx.clone());
    let slot = ctx.lock_maneuver_slot().await;
    let abort = executor.execute(circularization_node(), &slot).await.unwrap_err();

    assert_eq!(abort.state(), ExecutorState::Burning);
    assert_eq!(abort.cause(), &GuidanceError::TelemetryUnavailable(LinkError::Disconnected));
    assert_eq!(executor.state(), ExecutorState::Aborted);
    link.with(|st| {
        assert_eq!(st.throttle, 0.0);
        assert!(st.nodes.is_empty());
        assert_eq!(st.removed_nodes.len(), 1);
    })
    .await;
    assert_eq!(drain(&mut rx).last().map(String::as_str), Some("Maneuver aborted"));
}

#[tokio::test(start_paused = true)]
async fn test_executor_times_out_on_attitude_lock() {
    let mut state = MockState::new();
    state.hang_attitude = true;
    let (link, ctx, _rx) = context(state, CancellationToken::new());
    let mut executor = ManeuverExecutor::new(ctx.clone());
    let slot = ctx.lock_maneuver_slot().await;
    let abort = executor.execute(circularization_node(), &slot).await.unwrap_err();

    assert_eq!(abort.state(), ExecutorState::Orienting);
    assert_eq!(abort.cause(), &GuidanceError::ActuationTimeout(Duration::from_secs(120)));
    link.with(|st| {
        assert_eq!(st.throttle, 0.0);
        assert!(st.nodes.is_empty());
        assert!(!st.throttle_log.contains(&1.0));
    })
    .await;
}

#[tokio::test]
async fn test_executor_observes_cancellation() {
    let c_tok = CancellationToken::new();
    c_tok.cancel();
    let (link, ctx, _rx) = context(MockState::new(), c_tok);
    let mut executor = ManeuverExecutor::new(ctx.clone());
    let slot = ctx.lock_maneuver_slot().await;
    let abort = executor.execute(circularization_node(), &slot).await.unwrap_err();

    assert_eq!(abort.state(), ExecutorState::Orienting);
    assert_eq!(abort.cause(), &GuidanceError::Cancelled);
    assert_eq!(executor.trace().last(), Some(&ExecutorState::Aborted));
    link.with(|st| assert!(st.nodes.is_empty())).await;
}

#[tokio::test]
async fn test_executor_times_out_on_endless_trim() {
    let mut state = MockState::new();
    state.burn_rate = 1.0e-3;
    let (link, ctx, _rx) = context(state, CancellationToken::new());
    let mut executor = ManeuverExecutor::new(ctx.clone());
    let slot = ctx.lock_maneuver_slot().await;
    let abort = executor.execute(circularization_node(), &slot).await.unwrap_err();
    assert_eq!(abort.state(), ExecutorState::Trimming);
    assert_eq!(abort.cause(), &GuidanceError::ActuationTimeout(Duration::from_secs(120)));
    link.with(|st| {
        assert_eq!(st.throttle, 0.0);
        assert_eq!(st.throttle_log.last(), Some(&0.0));
        assert!(st.nodes.is_empty());
        assert_eq!(st.removed_nodes, vec![NodeHandle(1)]);
    })
    .await;
}

/// Runs the circularization node against a clock that fails from `fail_from` on.
async fn abort_on_clock_loss(fail_from: f64) -> (ExecutorState, Vec<String>) {
    let mut state = MockState::new();
    state.fail_ut_from = Some(fail_from);
    let (link, ctx, mut rx) = context(state, CancellationToken::new());
    let mut executor = ManeuverExecutor::new(ctx.clone());
    let slot = ctx.lock_maneuver_slot().await;
    let abort = executor.execute(circularization_node(), &slot).await.unwrap_err();

    assert_eq!(abort.cause(), &GuidanceError::TelemetryUnavailable(LinkError::Disconnected));
    assert_eq!(executor.state(), ExecutorState::Aborted);
    link.with(|st| {
        assert_eq!(st.throttle, 0.0);
        assert!(st.nodes.is_empty());
        assert_eq!(st.removed_nodes, vec![NodeHandle(1)]);
    })
    .await;
    (abort.state(), drain(&mut rx))
}

#[tokio::test]
async fn test_executor_aborts_on_telemetry_loss_while_waiting_for_window() {
    let (state, calls) = abort_on_clock_loss(90.0).await;
    assert_eq!(state, ExecutorState::WaitingForWindow);
    assert_eq!(calls, vec!["Ready to execute burn".to_string(), "Maneuver aborted".to_string()]);
}

#[tokio::test]
async fn test_executor_aborts_on_telemetry_loss_while_trimming() {
    // full throttle until 102.0, the trim runs for another 10s at 5%
    let (state, calls) = abort_on_clock_loss(105.0).await;
    assert_eq!(state, ExecutorState::Trimming);
    assert_eq!(calls.last().map(String::as_str), Some("Maneuver aborted"));
    assert!(calls.contains(&"Fine tuning".to_string()));
}

#[tokio::test]
async fn test_executor_restarts_after_terminal_state() {
    let (_link, ctx, _rx) = context(MockState::new(), CancellationToken::new());
    let mut executor = ManeuverExecutor::new(ctx.clone());
    let slot = ctx.lock_maneuver_slot().await;
    executor.execute(circularization_node(), &slot).await.unwrap();
    let later = ManeuverNode::prograde(ManeuverKind::Circularization, 1_000.0, 12.0, 1.0);
    executor.execute(later, &slot).await.unwrap();
    assert_eq!(executor.trace().first(), Some(&ExecutorState::Idle));
    assert_eq!(executor.trace().len(), 7);
}
