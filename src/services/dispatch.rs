//! Dispatch controller - decides when to commit a vehicle to a gate
//!
//! State machine:
//! - `Idle -> Dispatched` once the top-scoring gate has stayed strictly above
//!   the trigger threshold for `sustain_ticks` consecutive ticks
//! - `Dispatched -> Idle` only through `clear()` (stop / reset)
//!
//! While dispatched the trigger is not re-evaluated. With `redirect_enabled`
//! a different gate that sustains the breach retargets the active dispatch
//! instead.

use crate::domain::geometry::{distance, Point};
use crate::domain::types::{CarStatus, DispatchState, GateId, GateReading};
use crate::infra::config::DispatchParams;
use crate::services::scorer::best_reading;
use tracing::{debug, info};
use uuid::Uuid;

/// Transition produced by a single evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchTransition {
    Triggered { gate: GateId, eta_secs: u32, confidence: u8 },
    Redirected { from: GateId, to: GateId, eta_secs: u32, confidence: u8 },
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,
    Dispatched { id: Uuid, target: GateId, eta_secs: u32, car_status: CarStatus },
}

/// Consecutive ticks a gate has held the top score above threshold
#[derive(Debug, Clone, PartialEq)]
struct Streak {
    gate: GateId,
    ticks: u32,
}

/// Whole-second ETA for a pedestrian `distance_units` away walking `speed` units per tick
pub fn eta_secs(distance_units: f64, speed: f64, divisor: f64) -> u32 {
    debug_assert!(distance_units.is_finite(), "non-finite distance {distance_units}");
    if speed <= 0.0 || divisor <= 0.0 {
        return 0;
    }
    (distance_units / speed / divisor).round() as u32
}

pub struct DispatchController {
    params: DispatchParams,
    phase: Phase,
    streak: Option<Streak>,
}

impl DispatchController {
    pub fn new(params: DispatchParams) -> Self {
        Self { params, phase: Phase::Idle, streak: None }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Dispatched { .. })
    }

    pub fn target(&self) -> Option<&GateId> {
        match &self.phase {
            Phase::Dispatched { target, .. } => Some(target),
            Phase::Idle => None,
        }
    }

    /// Snapshot for the presentation layer
    pub fn state(&self) -> DispatchState {
        match &self.phase {
            Phase::Idle => DispatchState::default(),
            Phase::Dispatched { id, target, eta_secs, car_status } => DispatchState {
                active: true,
                dispatch_id: Some(*id),
                target: Some(target.clone()),
                eta_secs: Some(*eta_secs),
                car_status: Some(*car_status),
            },
        }
    }

    /// Drop any active dispatch and pending streak
    pub fn clear(&mut self) {
        if let Phase::Dispatched { id, target, .. } = &self.phase {
            info!(dispatch_id = %id, gate = %target, "dispatch_cleared");
        }
        self.phase = Phase::Idle;
        self.streak = None;
    }

    /// Inspect this tick's readings and fire a transition if warranted
    ///
    /// `position` and `speed` describe the pedestrian after this tick's move
    /// and feed the ETA estimate.
    pub fn evaluate(
        &mut self,
        readings: &[GateReading],
        position: Point,
        speed: f64,
    ) -> Option<DispatchTransition> {
        if self.is_active() && !self.params.redirect_enabled {
            return None;
        }

        let best = best_reading(readings)?;
        if best.confidence <= self.params.trigger_threshold {
            self.streak = None;
            return None;
        }

        let ticks = match &mut self.streak {
            Some(streak) if streak.gate == best.id => {
                streak.ticks = streak.ticks.saturating_add(1);
                streak.ticks
            }
            _ => {
                self.streak = Some(Streak { gate: best.id.clone(), ticks: 1 });
                1
            }
        };

        if ticks < self.params.sustain_ticks {
            debug!(
                gate = %best.id,
                confidence = %best.confidence,
                ticks = %ticks,
                sustain_ticks = %self.params.sustain_ticks,
                "dispatch_breach_pending"
            );
            return None;
        }

        let eta = eta_secs(distance(position, best.position), speed, self.params.eta_divisor);

        match &mut self.phase {
            Phase::Idle => {
                let id = Uuid::now_v7();
                self.phase = Phase::Dispatched {
                    id,
                    target: best.id.clone(),
                    eta_secs: eta,
                    car_status: CarStatus::Dispatched,
                };
                info!(
                    dispatch_id = %id,
                    gate = %best.id,
                    confidence = %best.confidence,
                    eta_secs = %eta,
                    "dispatch_triggered"
                );
                Some(DispatchTransition::Triggered {
                    gate: best.id.clone(),
                    eta_secs: eta,
                    confidence: best.confidence,
                })
            }
            Phase::Dispatched { id, target, eta_secs, .. } => {
                if *target == best.id {
                    return None;
                }
                let from = std::mem::replace(target, best.id.clone());
                *eta_secs = eta;
                info!(
                    dispatch_id = %id,
                    from = %from,
                    to = %best.id,
                    confidence = %best.confidence,
                    eta_secs = %eta,
                    "dispatch_redirected"
                );
                Some(DispatchTransition::Redirected {
                    from,
                    to: best.id.clone(),
                    eta_secs: eta,
                    confidence: best.confidence,
                })
            }
        }
    }
}
