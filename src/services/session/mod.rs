//! Simulation session - single owner of all engine state
//!
//! The session exposes the command surface consumed by drivers and
//! presentation layers:
//! - `start()` / `stop()` - idempotent; stopping clears any active dispatch
//! - `reset()` - stops and restores every entity to its initial state
//! - `perturb_direction()` - bounded heading change, allowed at any time
//! - `tick()` - one movement -> proximity -> confidence -> dispatch pass
//!
//! `tick()` is synchronous and does nothing while stopped, so any driver
//! (real-time ticker, test harness) can call it.

#[cfg(test)]
mod tests;

use crate::domain::log::{ActivityEntry, ActivityKind, ActivityLog};
use crate::domain::types::{
    BeaconReading, DispatchState, GateId, GateReading, Pedestrian, ScoreBreakdown,
};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::services::dispatch::{DispatchController, DispatchTransition};
use crate::services::movement::{self, Bounds, MoveOutcome};
use crate::services::proximity;
use crate::services::scorer::{self, GateReadings};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Result of one executed tick
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub tick: u64,
    pub movement: MoveOutcome,
    pub transition: Option<DispatchTransition>,
}

/// Everything the presentation layer needs after a tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub tick: u64,
    pub running: bool,
    pub pedestrian: Pedestrian,
    pub gates: Vec<GateReading>,
    pub beacons: Vec<BeaconReading>,
    pub dispatch: DispatchState,
    pub log: Vec<ActivityEntry>,
}

pub struct Session {
    pub(crate) config: Config,
    pub(crate) pedestrian: Pedestrian,
    pub(crate) gate_readings: GateReadings,
    pub(crate) beacon_readings: Vec<BeaconReading>,
    pub(crate) dispatch: DispatchController,
    pub(crate) log: ActivityLog,
    pub(crate) running: bool,
    pub(crate) tick_count: u64,
    metrics: Option<Arc<Metrics>>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            pedestrian: config.initial_pedestrian(),
            gate_readings: Self::initial_gate_readings(&config),
            beacon_readings: Self::initial_beacon_readings(&config),
            dispatch: DispatchController::new(config.dispatch().clone()),
            log: ActivityLog::new(config.log_capacity()),
            running: false,
            tick_count: 0,
            metrics: None,
            config,
        }
    }

    /// Create a session that records tick and dispatch metrics
    pub fn with_metrics(config: Config, metrics: Arc<Metrics>) -> Self {
        let mut session = Self::new(config);
        session.metrics = Some(metrics);
        session
    }

    fn initial_gate_readings(config: &Config) -> GateReadings {
        config
            .gates()
            .iter()
            .map(|gate| GateReading {
                id: gate.id.clone(),
                position: gate.position,
                confidence: 0,
                breakdown: ScoreBreakdown::default(),
            })
            .collect()
    }

    fn initial_beacon_readings(config: &Config) -> Vec<BeaconReading> {
        config
            .beacons()
            .iter()
            .map(|beacon| BeaconReading { id: beacon.id.clone(), position: beacon.position, strength: 0.0 })
            .collect()
    }

    fn bounds(&self) -> Bounds {
        Bounds { width: self.config.venue_width(), height: self.config.venue_height() }
    }

    fn gate_name(&self, id: &GateId) -> String {
        self.config.gate(id).map(|g| g.name.clone()).unwrap_or_else(|| id.to_string())
    }

    /// Begin ticking. Returns false if already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            debug!("session_already_running");
            return false;
        }
        self.running = true;
        self.log.push(
            self.tick_count,
            ActivityKind::SimulationStarted,
            "Simulation started".to_string(),
        );
        info!(tick = %self.tick_count, "simulation_started");
        true
    }

    /// Stop ticking and clear any dispatch. Returns false if already stopped.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            debug!("session_already_stopped");
            return false;
        }
        self.running = false;
        self.dispatch.clear();
        self.log.push(
            self.tick_count,
            ActivityKind::SimulationStopped,
            "Simulation stopped".to_string(),
        );
        info!(tick = %self.tick_count, "simulation_stopped");
        true
    }

    /// Stop and restore pedestrian, readings, dispatch and log to initial values
    pub fn reset(&mut self) {
        self.running = false;
        self.dispatch.clear();
        self.pedestrian = self.config.initial_pedestrian();
        self.gate_readings = Self::initial_gate_readings(&self.config);
        self.beacon_readings = Self::initial_beacon_readings(&self.config);
        self.log.clear();
        self.tick_count = 0;
        info!("simulation_reset");
    }

    /// Rotate the pedestrian heading by a bounded offset; returns the new heading
    pub fn perturb_direction(&mut self, offset_degrees: f64) -> f64 {
        let heading = movement::perturb_heading(
            &mut self.pedestrian,
            offset_degrees,
            self.config.perturb_max_degrees(),
        );
        self.log.push(
            self.tick_count,
            ActivityKind::DirectionChanged { heading },
            format!("Direction changed to {:.0}°", heading),
        );
        if let Some(ref metrics) = self.metrics {
            metrics.record_direction_change();
        }
        info!(
            offset = %format!("{:.1}", offset_degrees),
            heading = %format!("{:.1}", heading),
            "direction_changed"
        );
        heading
    }

    /// Run one full pipeline pass. Returns None while stopped.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        if !self.running {
            return None;
        }
        let tick_start = Instant::now();
        self.tick_count += 1;

        let bounds = self.bounds();
        let scoring = self.config.scoring();
        let movement = movement::advance(
            &mut self.pedestrian,
            bounds,
            self.config.gates(),
            scoring.approach_radius,
            self.config.tick_secs(),
        );
        if let Some(ref change) = movement.zone_change {
            debug!(
                tick = %self.tick_count,
                change = ?change,
                dwell_secs = %self.pedestrian.dwell_secs,
                "approach_zone_changed"
            );
        }

        self.beacon_readings = proximity::beacon_readings(
            self.config.beacons(),
            self.pedestrian.position,
            scoring.beacon_max_range,
        );
        self.gate_readings = scorer::score_gates(&self.pedestrian, self.config.gates(), scoring);

        let transition = self.dispatch.evaluate(
            &self.gate_readings,
            self.pedestrian.position,
            self.pedestrian.speed,
        );
        if let Some(ref t) = transition {
            self.record_transition(t);
        }

        if let Some(ref metrics) = self.metrics {
            metrics.record_tick(tick_start.elapsed().as_micros() as u64);
        }

        Some(TickOutcome { tick: self.tick_count, movement, transition })
    }

    fn record_transition(&mut self, transition: &DispatchTransition) {
        match transition {
            DispatchTransition::Triggered { gate, eta_secs, .. } => {
                let message = format!("Car dispatched to {} (ETA {}s)", self.gate_name(gate), eta_secs);
                self.log.push(
                    self.tick_count,
                    ActivityKind::DispatchTriggered { gate: gate.clone(), eta_secs: *eta_secs },
                    message,
                );
                if let Some(ref metrics) = self.metrics {
                    metrics.record_dispatch(gate);
                }
            }
            DispatchTransition::Redirected { from, to, eta_secs, .. } => {
                let message = format!(
                    "Car redirected from {} to {} (ETA {}s)",
                    self.gate_name(from),
                    self.gate_name(to),
                    eta_secs
                );
                self.log.push(
                    self.tick_count,
                    ActivityKind::DispatchRedirected {
                        from: from.clone(),
                        to: to.clone(),
                        eta_secs: *eta_secs,
                    },
                    message,
                );
                if let Some(ref metrics) = self.metrics {
                    metrics.record_redirect(to);
                }
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pedestrian(&self) -> &Pedestrian {
        &self.pedestrian
    }

    pub fn gate_readings(&self) -> &[GateReading] {
        &self.gate_readings
    }

    pub fn beacon_readings(&self) -> &[BeaconReading] {
        &self.beacon_readings
    }

    pub fn dispatch_state(&self) -> DispatchState {
        self.dispatch.state()
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            tick: self.tick_count,
            running: self.running,
            pedestrian: self.pedestrian.clone(),
            gates: self.gate_readings.to_vec(),
            beacons: self.beacon_readings.clone(),
            dispatch: self.dispatch.state(),
            log: self.log.to_vec(),
        }
    }
}
