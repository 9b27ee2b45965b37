//! Shared types for the gate prediction engine

use crate::domain::geometry::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Newtype wrapper for gate IDs to provide type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GateId(pub String);

impl GateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype wrapper for beacon IDs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BeaconId(pub String);

impl std::fmt::Display for BeaconId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Simulated pedestrian state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pedestrian {
    pub position: Point,
    /// Degrees in [0, 360)
    pub heading: f64,
    /// Venue units per tick
    pub speed: f64,
    /// Gate whose approach zone currently contains the pedestrian
    pub approach_zone: Option<GateId>,
    /// Seconds spent continuously inside `approach_zone`
    pub dwell_secs: f64,
}

impl Pedestrian {
    #[inline]
    pub fn new(position: Point, heading: f64, speed: f64) -> Self {
        Self { position, heading, speed, approach_zone: None, dwell_secs: 0.0 }
    }

    #[inline]
    pub fn heading_rad(&self) -> f64 {
        self.heading.to_radians()
    }

    /// Dwell seconds attributable to `gate`, zero unless it is the current zone
    pub fn dwell_at(&self, gate: &GateId) -> f64 {
        match &self.approach_zone {
            Some(zone) if zone == gate => self.dwell_secs,
            _ => 0.0,
        }
    }
}

/// Exit gate definition (immutable for the lifetime of a session)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub id: GateId,
    pub name: String,
    pub position: Point,
    pub color: String,
}

/// Signal beacon definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beacon {
    pub id: BeaconId,
    pub position: Point,
}

/// Component scores behind a gate confidence, each 0-100
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScoreBreakdown {
    pub proximity: f64,
    pub vector: f64,
    pub dwell: f64,
}

/// Per-tick confidence for one gate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateReading {
    pub id: GateId,
    pub position: Point,
    /// 0-100
    pub confidence: u8,
    pub breakdown: ScoreBreakdown,
}

/// Per-tick signal strength for one beacon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeaconReading {
    pub id: BeaconId,
    pub position: Point,
    /// 0-100
    pub strength: f64,
}

/// Lifecycle of the dispatched vehicle
///
/// Only `Dispatched` is ever produced by the engine; the later stages belong
/// to whatever executes the dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CarStatus {
    Dispatched,
    EnRoute,
    Arrived,
}

impl CarStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CarStatus::Dispatched => "dispatched",
            CarStatus::EnRoute => "en-route",
            CarStatus::Arrived => "arrived",
        }
    }
}

/// Current dispatch, as exposed to the presentation layer
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DispatchState {
    pub active: bool,
    /// UUIDv7 assigned when the dispatch fires, kept across redirects
    pub dispatch_id: Option<Uuid>,
    pub target: Option<GateId>,
    pub eta_secs: Option<u32>,
    pub car_status: Option<CarStatus>,
}
