//! Planar geometry helpers shared by the movement model and the scorers
//!
//! Venue coordinates are screen-style: x grows right, y grows down. Angles
//! follow `atan2` conventions so a heading of 0° points along +x and 90°
//! points along +y.

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// A position in venue coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Euclidean distance between two points
#[inline]
pub fn distance(p1: Point, p2: Point) -> f64 {
    (p2.x - p1.x).hypot(p2.y - p1.y)
}

/// Angle in radians of the vector `from -> to`, in (-π, π]
#[inline]
pub fn angle_to(from: Point, to: Point) -> f64 {
    (to.y - from.y).atan2(to.x - from.x)
}

/// Smallest unsigned difference between two angles (radians), in [0, π]
pub fn angle_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(TAU);
    if diff > PI {
        TAU - diff
    } else {
        diff
    }
}

/// Wrap a heading in degrees into [0, 360)
pub fn normalize_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
