//! Tests for the Session module

use super::*;
use crate::domain::geometry::Point;
use crate::domain::types::{CarStatus, Gate, GateId};
use crate::services::movement::ZoneChange;

fn east() -> GateId {
    GateId::new("east")
}

fn west() -> GateId {
    GateId::new("west")
}

/// Session whose first tick lands the pedestrian exactly on the east gate
fn session_at_east_gate(config: Config) -> Session {
    let config = config.with_start(Point::new(758.0, 300.0), 0.0, 2.0);
    let mut session = Session::new(config);
    prime_dwell(&mut session, east(), 50.0);
    session
}

fn prime_dwell(session: &mut Session, gate: GateId, dwell_secs: f64) {
    session.pedestrian.approach_zone = Some(gate);
    session.pedestrian.dwell_secs = dwell_secs;
}

/// Set up the next tick to end 2 units short of `gate`, facing it, with saturated dwell
fn hold_before_gate(session: &mut Session, gate: &GateId) {
    let target = session.config.gate(gate).unwrap().position;
    let (start, heading) = if target.x > 400.0 {
        (Point::new(target.x - 4.0, target.y), 0.0)
    } else {
        (Point::new(target.x + 4.0, target.y), 180.0)
    };
    session.pedestrian.position = start;
    session.pedestrian.heading = heading;
    session.pedestrian.speed = 2.0;
    prime_dwell(session, gate.clone(), 60.0);
}

fn triggered_count(session: &Session) -> usize {
    session
        .log()
        .iter()
        .filter(|e| matches!(e.kind, ActivityKind::DispatchTriggered { .. }))
        .count()
}

#[test]
fn test_tick_is_noop_while_stopped() {
    let mut session = Session::new(Config::default());
    assert!(session.tick().is_none());
    assert_eq!(session.tick_count(), 0);
    assert_eq!(session.pedestrian().position, Point::new(400.0, 300.0));
}

#[test]
fn test_start_stop_idempotent() {
    let mut session = Session::new(Config::default());

    assert!(!session.stop());
    assert!(session.log().is_empty());

    assert!(session.start());
    assert!(!session.start());
    assert_eq!(session.log().len(), 1);
    assert!(session.is_running());

    assert!(session.stop());
    assert!(!session.stop());
    assert_eq!(session.log().len(), 2);
    assert_eq!(session.log().latest().unwrap().kind, ActivityKind::SimulationStopped);
}

#[test]
fn test_reset_when_stopped_is_safe() {
    let mut session = Session::new(Config::default());
    session.reset();
    assert_eq!(session.snapshot(), Session::new(Config::default()).snapshot());
}

#[test]
fn test_walk_from_center_stays_in_bounds() {
    let mut session = Session::new(Config::default());
    session.start();
    for _ in 0..5_000 {
        let outcome = session.tick().unwrap();
        let pos = session.pedestrian().position;
        assert!((0.0..=800.0).contains(&pos.x), "tick {}: {}", outcome.tick, pos);
        assert!((0.0..=600.0).contains(&pos.y), "tick {}: {}", outcome.tick, pos);
        for reading in session.gate_readings() {
            assert!(reading.confidence <= 100);
        }
        for reading in session.beacon_readings() {
            assert!((0.0..=100.0).contains(&reading.strength));
        }
    }
    assert_eq!(session.tick_count(), 5_000);
}

#[test]
fn test_straight_walk_reflects_off_east_wall() {
    let mut session = Session::new(Config::default());
    session.start();
    // 400 units to the wall at 1.2 units/tick
    let mut reflected = false;
    for _ in 0..400 {
        let outcome = session.tick().unwrap();
        if outcome.movement.reflected_x {
            reflected = true;
            assert_eq!(session.pedestrian().position.x, 800.0);
            assert!((session.pedestrian().heading - 180.0).abs() < 1e-9);
        }
    }
    assert!(reflected);
}

#[test]
fn test_dispatch_at_gate_with_saturated_dwell() {
    let mut session = session_at_east_gate(Config::default());
    session.start();

    let outcome = session.tick().unwrap();
    assert_eq!(session.pedestrian().position, Point::new(760.0, 300.0));

    let east_reading = session.gate_readings().iter().find(|r| r.id == east()).unwrap();
    assert_eq!(east_reading.confidence, 100);
    assert_eq!(
        outcome.transition,
        Some(DispatchTransition::Triggered { gate: east(), eta_secs: 0, confidence: 100 })
    );

    let dispatch = session.dispatch_state();
    assert!(dispatch.active);
    assert_eq!(dispatch.target, Some(east()));
    assert_eq!(dispatch.eta_secs, Some(0));
    assert_eq!(dispatch.car_status, Some(CarStatus::Dispatched));

    let latest = session.log().latest().unwrap();
    assert_eq!(latest.message, "Car dispatched to East Gate (ETA 0s)");
}

#[test]
fn test_dispatch_fires_once_under_sustained_breach() {
    let mut session = Session::new(Config::default());
    session.start();

    let mut triggers = 0;
    for i in 0..50 {
        // Second half of the run favours the west gate; target must not move
        let gate = if i < 25 { east() } else { west() };
        hold_before_gate(&mut session, &gate);
        let outcome = session.tick().unwrap();
        let best = scorer::best_reading(session.gate_readings()).unwrap();
        assert_eq!(best.id, gate);
        assert!(best.confidence > 90);
        if outcome.transition.is_some() {
            triggers += 1;
        }
    }

    assert_eq!(triggers, 1);
    assert_eq!(triggered_count(&session), 1);
    assert_eq!(session.dispatch_state().target, Some(east()));
}

#[test]
fn test_redirect_when_enabled() {
    let config = Config::default().with_dispatch(3, true);
    let mut session = Session::new(config);
    session.start();

    for _ in 0..3 {
        hold_before_gate(&mut session, &east());
        session.tick();
    }
    assert_eq!(session.dispatch_state().target, Some(east()));
    let dispatch_id = session.dispatch_state().dispatch_id;

    let mut transitions = Vec::new();
    for _ in 0..3 {
        hold_before_gate(&mut session, &west());
        transitions.extend(session.tick().unwrap().transition);
    }

    assert_eq!(transitions.len(), 1);
    assert!(matches!(
        &transitions[0],
        DispatchTransition::Redirected { from, to, .. } if *from == east() && *to == west()
    ));
    let state = session.dispatch_state();
    assert_eq!(state.target, Some(west()));
    assert_eq!(state.dispatch_id, dispatch_id);
    assert_eq!(
        session.log().latest().unwrap().message,
        "Car redirected from East Gate to West Gate (ETA 0s)"
    );
}

#[test]
fn test_sustain_ticks_delays_dispatch() {
    let config = Config::default().with_dispatch(3, false);
    let mut session = Session::new(config);
    session.start();

    for expected_active in [false, false, true] {
        hold_before_gate(&mut session, &east());
        session.tick();
        assert_eq!(session.dispatch_state().active, expected_active);
    }
}

#[test]
fn test_stop_clears_dispatch() {
    let mut session = session_at_east_gate(Config::default());
    session.start();
    session.tick();
    assert!(session.dispatch_state().active);

    session.stop();
    assert_eq!(session.dispatch_state(), DispatchState::default());
    assert!(session.tick().is_none());

    // Restart and breach again: a new dispatch fires
    session.start();
    hold_before_gate(&mut session, &east());
    assert!(session.tick().unwrap().transition.is_some());
    assert_eq!(triggered_count(&session), 2);
}

#[test]
fn test_reset_after_dispatch_restores_initial_state() {
    let pristine = Session::new(Config::default()).snapshot();

    let mut session = Session::new(Config::default());
    session.start();
    for _ in 0..10 {
        session.tick();
    }
    session.perturb_direction(30.0);
    hold_before_gate(&mut session, &east());
    session.tick();
    assert!(session.dispatch_state().active);

    session.reset();

    let snapshot = session.snapshot();
    assert_eq!(snapshot, pristine);
    assert!(!snapshot.running);
    assert_eq!(snapshot.tick, 0);
    assert!(snapshot.log.is_empty());
    assert!(snapshot.gates.iter().all(|g| g.confidence == 0));
    assert!(snapshot.beacons.iter().all(|b| b.strength == 0.0));
    assert_eq!(snapshot.dispatch, DispatchState::default());
    assert_eq!(snapshot.pedestrian, Config::default().initial_pedestrian());
}

#[test]
fn test_dwell_enter_stay_leave() {
    let config = Config::default().with_start(Point::new(679.0, 300.0), 0.0, 2.0);
    let mut session = Session::new(config);
    session.start();

    // 681 is 79 units from the east gate: inside the zone
    let outcome = session.tick().unwrap();
    assert_eq!(outcome.movement.zone_change, Some(ZoneChange::Entered(east())));
    assert!((session.pedestrian().dwell_secs - 0.2).abs() < 1e-9);

    session.tick();
    assert!((session.pedestrian().dwell_secs - 0.4).abs() < 1e-9);

    // Turn around: 681 (still inside), then 679 (outside)
    session.pedestrian.heading = 180.0;
    session.tick();
    assert!((session.pedestrian().dwell_secs - 0.6).abs() < 1e-9);
    let outcome = session.tick().unwrap();
    assert_eq!(outcome.movement.zone_change, Some(ZoneChange::Left(east())));
    assert_eq!(session.pedestrian().dwell_secs, 0.0);
    assert!(session.pedestrian().approach_zone.is_none());
}

#[test]
fn test_perturb_direction_logs_and_bounds() {
    let mut session = Session::new(Config::default());
    let heading = session.perturb_direction(120.0);
    assert!((heading - 45.0).abs() < 1e-9);
    assert!(matches!(
        session.log().latest().unwrap().kind,
        ActivityKind::DirectionChanged { heading } if (heading - 45.0).abs() < 1e-9
    ));
    assert_eq!(session.log().latest().unwrap().message, "Direction changed to 45°");
}

#[test]
fn test_log_is_capped_newest_first() {
    let mut session = Session::new(Config::default());
    for i in 0..15 {
        session.perturb_direction(if i % 2 == 0 { 10.0 } else { -5.0 });
    }
    assert_eq!(session.log().len(), 10);

    // Eight +10 turns and seven -5 turns
    match &session.log().latest().unwrap().kind {
        ActivityKind::DirectionChanged { heading } => assert!((heading - 45.0).abs() < 1e-9),
        other => panic!("unexpected entry {other:?}"),
    }
}

#[test]
fn test_metrics_recorded() {
    let metrics = Arc::new(Metrics::new());
    let config = Config::default().with_start(Point::new(758.0, 300.0), 0.0, 2.0);
    let mut session = Session::with_metrics(config, metrics.clone());
    prime_dwell(&mut session, east(), 50.0);
    session.start();
    session.tick();
    session.tick();
    session.perturb_direction(5.0);

    assert_eq!(metrics.ticks_total(), 2);
    assert_eq!(metrics.dispatches_total(), 1);
    assert_eq!(metrics.dispatches_for(&east()), 1);
    assert_eq!(metrics.direction_changes_total(), 1);
}

#[test]
fn test_snapshot_serializes() {
    let mut session = Session::new(Config::default());
    session.start();
    session.tick();

    let value = serde_json::to_value(session.snapshot()).unwrap();
    assert_eq!(value["tick"], 1);
    assert_eq!(value["running"], true);
    assert_eq!(value["gates"].as_array().unwrap().len(), 4);
    assert_eq!(value["beacons"].as_array().unwrap().len(), 6);
    assert_eq!(value["dispatch"]["active"], false);
    assert_eq!(value["log"][0]["kind"]["t"], "simulation_started");
    assert!(value["pedestrian"]["position"]["x"].as_f64().unwrap() > 400.0);
}

#[test]
fn test_overlapping_zones_first_gate_wins() {
    let gate = |id: &str, x: f64| Gate {
        id: GateId::new(id),
        name: id.to_uppercase(),
        position: Point::new(x, 100.0),
        color: "#FFFFFF".to_string(),
    };
    let config = Config::default()
        .with_gates(vec![gate("a", 100.0), gate("b", 150.0)])
        .with_start(Point::new(125.0, 100.0), 90.0, 0.5);
    let mut session = Session::new(config);
    session.start();
    session.tick();

    assert_eq!(session.pedestrian().approach_zone, Some(GateId::new("a")));
    assert_eq!(session.pedestrian().dwell_at(&GateId::new("a")), session.config().tick_secs());
    assert_eq!(session.pedestrian().dwell_at(&GateId::new("b")), 0.0);
    assert_eq!(session.gate_readings().len(), 2);
}
