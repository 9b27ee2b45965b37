//! Pedestrian movement simulator
//!
//! Each tick the pedestrian steps `speed` units along its heading. Leaving the
//! venue rectangle clamps the offending coordinate and mirrors the heading
//! (`180 - h` off a vertical wall, `-h` off a horizontal one). Afterwards the
//! approach zone is re-evaluated and dwell time updated.

use crate::domain::geometry::{normalize_degrees, Point};
use crate::domain::types::{Gate, GateId, Pedestrian};
use crate::services::scorer::approach_zone;
use rand::Rng;

/// Venue rectangle, origin at (0, 0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn contains(&self, p: Point) -> bool {
        (0.0..=self.width).contains(&p.x) && (0.0..=self.height).contains(&p.y)
    }
}

/// Approach-zone transition observed during a tick
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneChange {
    Entered(GateId),
    Left(GateId),
    Switched { from: GateId, to: GateId },
}

/// What happened to the pedestrian during one step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveOutcome {
    pub reflected_x: bool,
    pub reflected_y: bool,
    pub zone_change: Option<ZoneChange>,
}

/// Move one step along the heading, reflecting off the venue walls
pub fn step(pedestrian: &mut Pedestrian, bounds: Bounds) -> (bool, bool) {
    let heading_rad = pedestrian.heading_rad();
    let mut x = pedestrian.position.x + pedestrian.speed * heading_rad.cos();
    let mut y = pedestrian.position.y + pedestrian.speed * heading_rad.sin();
    let mut heading = pedestrian.heading;

    let reflected_x = x < 0.0 || x > bounds.width;
    if reflected_x {
        x = x.clamp(0.0, bounds.width);
        heading = 180.0 - heading;
    }

    let reflected_y = y < 0.0 || y > bounds.height;
    if reflected_y {
        y = y.clamp(0.0, bounds.height);
        heading = -heading;
    }

    pedestrian.position = Point::new(x, y);
    pedestrian.heading = normalize_degrees(heading);
    (reflected_x, reflected_y)
}

/// Re-evaluate the approach zone and update dwell time
///
/// Staying in the same zone adds `tick_secs`; entering a zone starts the
/// count at `tick_secs`; being outside every zone resets it to zero.
pub fn update_dwell(
    pedestrian: &mut Pedestrian,
    gates: &[Gate],
    approach_radius: f64,
    tick_secs: f64,
) -> Option<ZoneChange> {
    let current = approach_zone(pedestrian.position, gates, approach_radius).map(|g| &g.id);
    let previous = pedestrian.approach_zone.take();

    let change = match (previous.as_ref(), current) {
        (Some(prev), Some(cur)) if prev == cur => {
            pedestrian.dwell_secs += tick_secs;
            None
        }
        (Some(prev), Some(cur)) => {
            pedestrian.dwell_secs = tick_secs;
            Some(ZoneChange::Switched { from: prev.clone(), to: cur.clone() })
        }
        (None, Some(cur)) => {
            pedestrian.dwell_secs = tick_secs;
            Some(ZoneChange::Entered(cur.clone()))
        }
        (Some(prev), None) => {
            pedestrian.dwell_secs = 0.0;
            Some(ZoneChange::Left(prev.clone()))
        }
        (None, None) => {
            pedestrian.dwell_secs = 0.0;
            None
        }
    };

    pedestrian.approach_zone = current.cloned();
    change
}

/// Full movement phase of a tick
pub fn advance(
    pedestrian: &mut Pedestrian,
    bounds: Bounds,
    gates: &[Gate],
    approach_radius: f64,
    tick_secs: f64,
) -> MoveOutcome {
    let (reflected_x, reflected_y) = step(pedestrian, bounds);
    let zone_change = update_dwell(pedestrian, gates, approach_radius, tick_secs);
    MoveOutcome { reflected_x, reflected_y, zone_change }
}

/// Rotate the heading by `offset_degrees`, clamped to `±max_degrees`
pub fn perturb_heading(pedestrian: &mut Pedestrian, offset_degrees: f64, max_degrees: f64) -> f64 {
    let offset = if offset_degrees.is_finite() {
        offset_degrees.clamp(-max_degrees, max_degrees)
    } else {
        0.0
    };
    pedestrian.heading = normalize_degrees(pedestrian.heading + offset);
    pedestrian.heading
}

/// Uniform random heading offset in `[-max_degrees, max_degrees]`
pub fn random_offset<R: Rng>(rng: &mut R, max_degrees: f64) -> f64 {
    if max_degrees <= 0.0 {
        return 0.0;
    }
    rng.gen_range(-max_degrees..=max_degrees)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const BOUNDS: Bounds = Bounds { width: 800.0, height: 600.0 };
    const EPS: f64 = 1e-9;

    fn gate(id: &str, x: f64, y: f64) -> Gate {
        Gate {
            id: GateId::new(id),
            name: id.to_string(),
            position: Point::new(x, y),
            color: "#fff".to_string(),
        }
    }

    #[test]
    fn test_step_along_heading() {
        let mut ped = Pedestrian::new(Point::new(400.0, 300.0), 90.0, 2.0);
        step(&mut ped, BOUNDS);
        assert!((ped.position.x - 400.0).abs() < EPS);
        assert!((ped.position.y - 302.0).abs() < EPS);
    }

    #[test]
    fn test_reflect_off_vertical_wall() {
        let mut ped = Pedestrian::new(Point::new(799.5, 300.0), 30.0, 2.0);
        let (rx, ry) = step(&mut ped, BOUNDS);
        assert!(rx && !ry);
        assert_eq!(ped.position.x, 800.0);
        assert!((ped.heading - 150.0).abs() < EPS);
    }

    #[test]
    fn test_reflect_off_horizontal_wall() {
        let mut ped = Pedestrian::new(Point::new(400.0, 0.5), 270.0, 2.0);
        let (rx, ry) = step(&mut ped, BOUNDS);
        assert!(!rx && ry);
        assert_eq!(ped.position.y, 0.0);
        assert!((ped.heading - 90.0).abs() < EPS);
    }

    #[test]
    fn test_reflect_in_corner_applies_both() {
        let mut ped = Pedestrian::new(Point::new(799.5, 599.5), 45.0, 2.0);
        let (rx, ry) = step(&mut ped, BOUNDS);
        assert!(rx && ry);
        assert_eq!(ped.position, Point::new(800.0, 600.0));
        // 180 - 45 = 135, then -135 -> 225
        assert!((ped.heading - 225.0).abs() < EPS);
    }

    #[test]
    fn test_stays_in_bounds_over_long_walk() {
        let mut ped = Pedestrian::new(Point::new(400.0, 300.0), 0.0, 1.2);
        let mut rng = StdRng::seed_from_u64(7);
        for i in 0..20_000 {
            if i % 50 == 0 {
                let offset = random_offset(&mut rng, 45.0);
                perturb_heading(&mut ped, offset, 45.0);
            }
            step(&mut ped, BOUNDS);
            assert!(BOUNDS.contains(ped.position), "tick {i}: {}", ped.position);
            assert!((0.0..360.0).contains(&ped.heading));
        }
    }

    #[test]
    fn test_dwell_lifecycle() {
        let gates = [gate("a", 100.0, 100.0), gate("b", 300.0, 100.0)];
        let mut ped = Pedestrian::new(Point::new(100.0, 250.0), 0.0, 1.0);

        // Outside every zone
        assert_eq!(update_dwell(&mut ped, &gates, 80.0, 0.2), None);
        assert_eq!(ped.dwell_secs, 0.0);

        // Enter zone a
        ped.position = Point::new(100.0, 150.0);
        assert_eq!(update_dwell(&mut ped, &gates, 80.0, 0.2), Some(ZoneChange::Entered(GateId::new("a"))));
        assert!((ped.dwell_secs - 0.2).abs() < EPS);

        // Stay
        update_dwell(&mut ped, &gates, 80.0, 0.2);
        update_dwell(&mut ped, &gates, 80.0, 0.2);
        assert!((ped.dwell_secs - 0.6).abs() < EPS);

        // Jump straight into zone b: restarts at one increment
        ped.position = Point::new(300.0, 120.0);
        assert_eq!(
            update_dwell(&mut ped, &gates, 80.0, 0.2),
            Some(ZoneChange::Switched { from: GateId::new("a"), to: GateId::new("b") })
        );
        assert!((ped.dwell_secs - 0.2).abs() < EPS);
        assert_eq!(ped.approach_zone, Some(GateId::new("b")));

        // Leave all zones
        ped.position = Point::new(500.0, 500.0);
        assert_eq!(update_dwell(&mut ped, &gates, 80.0, 0.2), Some(ZoneChange::Left(GateId::new("b"))));
        assert_eq!(ped.dwell_secs, 0.0);
        assert!(ped.approach_zone.is_none());
    }

    #[test]
    fn test_advance_reports_zone_entry() {
        let gates = [gate("a", 100.0, 100.0)];
        let mut ped = Pedestrian::new(Point::new(100.0, 180.5), 270.0, 1.0);
        let outcome = advance(&mut ped, BOUNDS, &gates, 80.0, 0.2);
        assert_eq!(outcome.zone_change, Some(ZoneChange::Entered(GateId::new("a"))));
        assert!(!outcome.reflected_x && !outcome.reflected_y);
    }

    #[test]
    fn test_perturb_is_bounded_and_wraps() {
        let mut ped = Pedestrian::new(Point::new(0.0, 0.0), 350.0, 1.0);
        assert!((perturb_heading(&mut ped, 30.0, 45.0) - 20.0).abs() < EPS);
        assert!((perturb_heading(&mut ped, -500.0, 45.0) - 335.0).abs() < EPS);
        assert!((perturb_heading(&mut ped, f64::NAN, 45.0) - 335.0).abs() < EPS);
    }

    #[test]
    fn test_random_offset_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let offset = random_offset(&mut rng, 45.0);
            assert!((-45.0..=45.0).contains(&offset));
        }
        assert_eq!(random_offset(&mut rng, 0.0), 0.0);
    }
}
