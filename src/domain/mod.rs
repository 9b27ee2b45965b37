//! Domain models - venue entities and geometry
//!
//! This module contains the canonical data types used throughout the engine:
//! - `geometry` - points, distances and angle math
//! - `types` - `Pedestrian`, `Gate`, `Beacon`, readings and `DispatchState`
//! - `log` - bounded newest-first activity log

pub mod geometry;
pub mod log;
pub mod types;

// Re-export commonly used types at module level
pub use geometry::Point;
pub use log::{ActivityEntry, ActivityKind, ActivityLog};
pub use types::{
    Beacon, BeaconId, BeaconReading, CarStatus, DispatchState, Gate, GateId, GateReading,
    Pedestrian, ScoreBreakdown,
};
