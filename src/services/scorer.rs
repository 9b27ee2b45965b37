//! Gate confidence scoring
//!
//! Confidence that the pedestrian is heading for a gate blends three
//! components, each on a 0-100 scale:
//! - proximity: linear in straight-line distance, zero beyond `max_distance`
//! - vector: how closely the heading points at the gate
//! - dwell: time spent in the gate's approach zone
//!
//! All functions here are pure; the session calls them once per tick.

use crate::domain::geometry::{angle_difference, angle_to, distance, Point};
use crate::domain::types::{Gate, GateReading, Pedestrian, ScoreBreakdown};
use crate::infra::config::{ScoreWeights, ScoringParams};
use smallvec::SmallVec;
use std::f64::consts::PI;

/// Gate readings for one tick; venues rarely have more than a handful of gates
pub type GateReadings = SmallVec<[GateReading; 4]>;

#[inline]
pub fn proximity_score(distance_to_gate: f64, max_distance: f64) -> f64 {
    ((max_distance - distance_to_gate).max(0.0) / max_distance * 100.0).min(100.0)
}

/// Alignment between the heading (radians) and the bearing to the gate
#[inline]
pub fn vector_score(from: Point, heading_rad: f64, gate: Point) -> f64 {
    let diff = angle_difference(angle_to(from, gate), heading_rad);
    ((PI - diff) / PI * 100.0).clamp(0.0, 100.0)
}

#[inline]
pub fn dwell_score(dwell_secs: f64, points_per_sec: f64) -> f64 {
    (dwell_secs * points_per_sec).clamp(0.0, 100.0)
}

/// Weighted blend rounded to an integer confidence
#[inline]
pub fn combine(breakdown: &ScoreBreakdown, weights: &ScoreWeights) -> u8 {
    let raw = weights.proximity * breakdown.proximity
        + weights.vector * breakdown.vector
        + weights.dwell * breakdown.dwell;
    raw.round().clamp(0.0, 100.0) as u8
}

/// Score a single gate for the current pedestrian state
pub fn score_gate(pedestrian: &Pedestrian, gate: &Gate, params: &ScoringParams) -> GateReading {
    let breakdown = ScoreBreakdown {
        proximity: proximity_score(distance(pedestrian.position, gate.position), params.max_distance),
        vector: vector_score(pedestrian.position, pedestrian.heading_rad(), gate.position),
        dwell: dwell_score(pedestrian.dwell_at(&gate.id), params.dwell_points_per_sec),
    };

    GateReading {
        id: gate.id.clone(),
        position: gate.position,
        confidence: combine(&breakdown, &params.weights),
        breakdown,
    }
}

/// Score every gate, in declaration order
pub fn score_gates(pedestrian: &Pedestrian, gates: &[Gate], params: &ScoringParams) -> GateReadings {
    gates.iter().map(|gate| score_gate(pedestrian, gate, params)).collect()
}

/// Gate whose approach zone contains `position`
///
/// Zones may overlap; the first gate in declaration order wins.
pub fn approach_zone<'a>(position: Point, gates: &'a [Gate], radius: f64) -> Option<&'a Gate> {
    gates.iter().find(|gate| distance(position, gate.position) < radius)
}

/// Highest-confidence reading; ties go to the earliest gate
pub fn best_reading(readings: &[GateReading]) -> Option<&GateReading> {
    readings.iter().fold(None, |best: Option<&GateReading>, reading| match best {
        Some(b) if b.confidence >= reading.confidence => Some(b),
        _ => Some(reading),
    })
}
