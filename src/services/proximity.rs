//! Beacon proximity model
//!
//! Converts the pedestrian position into a simulated signal strength per
//! beacon. Strengths are display-only: the gate scorer never reads them.

use crate::domain::geometry::{distance, Point};
use crate::domain::types::{Beacon, BeaconReading};

/// Signal strength (0-100) at `distance_to_beacon`, linear falloff to zero at `max_range`
#[inline]
pub fn signal_strength(distance_to_beacon: f64, max_range: f64) -> f64 {
    ((max_range - distance_to_beacon) / max_range).clamp(0.0, 1.0) * 100.0
}

/// Readings for every beacon, in declaration order
pub fn beacon_readings(beacons: &[Beacon], position: Point, max_range: f64) -> Vec<BeaconReading> {
    beacons
        .iter()
        .map(|beacon| BeaconReading {
            id: beacon.id.clone(),
            position: beacon.position,
            strength: signal_strength(distance(position, beacon.position), max_range),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::BeaconId;

    #[test]
    fn test_strength_endpoints() {
        assert_eq!(signal_strength(0.0, 80.0), 100.0);
        assert_eq!(signal_strength(80.0, 80.0), 0.0);
        assert_eq!(signal_strength(500.0, 80.0), 0.0);
        assert!((signal_strength(20.0, 80.0) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_readings_follow_position() {
        let beacons = vec![
            Beacon { id: BeaconId("near".to_string()), position: Point::new(10.0, 0.0) },
            Beacon { id: BeaconId("far".to_string()), position: Point::new(300.0, 0.0) },
        ];
        let readings = beacon_readings(&beacons, Point::new(0.0, 0.0), 80.0);
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].id.0, "near");
        assert!((readings[0].strength - 87.5).abs() < 1e-9);
        assert_eq!(readings[1].strength, 0.0);
    }

    #[test]
    fn test_strength_always_in_range() {
        let beacon = Beacon { id: BeaconId("b".to_string()), position: Point::new(400.0, 300.0) };
        for x in (0..=800).step_by(37) {
            for y in (0..=600).step_by(29) {
                let r = &beacon_readings(
                    std::slice::from_ref(&beacon),
                    Point::new(x as f64, y as f64),
                    80.0,
                )[0];
                assert!((0.0..=100.0).contains(&r.strength));
            }
        }
    }
}
