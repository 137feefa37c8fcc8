//! Navigation derivation between consecutive waypoints
//!
//! Distance, course, speed-over-ground and the degree/minute decomposition
//! used for the DZG coordinate fields. Everything here is pure.

use crate::error::{DzgError, Result};
use crate::types::{Coordinate, Dms, Waypoint};
use chrono::{DateTime, Utc};
use geo::{Distance, Geodesic, Point};

/// One knot in meters per second
pub const KNOT_MS: f64 = 0.514444444;

/// Geodesic distance in meters on the WGS84 ellipsoid
pub fn geodesic_distance(a: Coordinate, b: Coordinate) -> f64 {
    Geodesic::distance(
        Point::new(a.longitude, a.latitude),
        Point::new(b.longitude, b.latitude),
    )
}

/// Initial compass bearing from `a` to `b` in degrees, normalized to [0, 360)
///
/// θ = atan2(sin(Δlon)·cos(lat2), cos(lat1)·sin(lat2) − sin(lat1)·cos(lat2)·cos(Δlon))
///
/// Identical points yield 0.0.
pub fn course(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let diff_lon = (b.longitude - a.longitude).to_radians();

    let x = diff_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * diff_lon.cos();

    let bearing = (x.atan2(y).to_degrees() + 360.0) % 360.0;
    // (-tiny + 360) % 360 rounds to 360.0
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// Whole seconds elapsed from `t0` to `t1`
pub fn elapsed_seconds(t0: DateTime<Utc>, t1: DateTime<Utc>) -> i64 {
    (t1 - t0).num_seconds()
}

/// Convert meters per second to knots
pub fn ms_to_knots(speed: f64) -> f64 {
    speed / KNOT_MS
}

/// Speed over ground in knots between two waypoints
///
/// Fails with [`DzgError::DegenerateInterval`] when the second waypoint is
/// not at least one whole second after the first.
pub fn speed_over_ground(from: &Waypoint, to: &Waypoint) -> Result<f64> {
    let seconds = elapsed_seconds(from.time, to.time);
    if seconds <= 0 {
        return Err(DzgError::DegenerateInterval { seconds });
    }
    let meters = geodesic_distance(from.coordinate(), to.coordinate());
    Ok(ms_to_knots(meters / seconds as f64))
}

/// Decompose decimal degrees into degrees, minutes and seconds digits.
///
/// The seconds value is rendered in its shortest decimal form with the
/// point removed (`36.5` becomes `"365"`, `0.0` becomes `"00"`); the DZG
/// appends these digits after the minutes as the minute fraction. The sign
/// of `dd` is carried by the degrees only.
pub fn dd_to_dms(dd: f64) -> Dms {
    let is_positive = dd >= 0.0;
    let dd = dd.abs();
    let (minutes, seconds) = floor_divmod(dd * 3600.0, 60.0);
    let (degrees, minutes) = floor_divmod(minutes, 60.0);
    let degrees = if is_positive { degrees } else { -degrees };

    let mut text = format!("{}", seconds);
    if !text.contains('.') {
        text.push_str(".0");
    }
    Dms {
        degrees,
        minutes,
        fraction: text.replace('.', ""),
    }
}

// Floor division with remainder for non-negative floats. The quotient is
// taken from (a - r) / b so that a == q * b + r holds as closely as it can.
fn floor_divmod(a: f64, b: f64) -> (f64, f64) {
    let r = a % b;
    let div = (a - r) / b;
    let mut q = div.floor();
    if div - q > 0.5 {
        q += 1.0;
    }
    (q, r)
}

/// Cumulative distance, interval speed and cumulative time along a waypoint sequence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackProfile {
    /// Meters from the first waypoint, starting at 0
    pub distances: Vec<f64>,
    /// Meters per second for each interval; `None` for a degenerate interval
    pub speeds: Vec<Option<f64>>,
    /// Whole seconds since the first waypoint, starting at 0
    pub times: Vec<i64>,
}

pub fn track_profile(waypoints: &[Waypoint]) -> TrackProfile {
    let mut profile = TrackProfile::default();
    let Some(first) = waypoints.first() else {
        return profile;
    };
    profile.distances.push(0.0);
    profile.times.push(0);

    let mut previous = first;
    for waypoint in &waypoints[1..] {
        let meters = geodesic_distance(previous.coordinate(), waypoint.coordinate());
        let seconds = elapsed_seconds(previous.time, waypoint.time);
        let total = profile.distances.last().copied().unwrap_or(0.0) + meters;
        profile.distances.push(total);
        profile
            .speeds
            .push((seconds > 0).then(|| meters / seconds as f64));
        let elapsed = profile.times.last().copied().unwrap_or(0) + seconds;
        profile.times.push(elapsed);
        previous = waypoint;
    }
    profile
}

/// Arithmetic mean, 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len().max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(seconds: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(seconds as i64)
    }

    #[test]
    fn test_course_cardinal_directions() {
        let origin = Coordinate::new(0.0, 0.0);
        assert!((course(origin, Coordinate::new(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((course(origin, Coordinate::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((course(origin, Coordinate::new(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((course(origin, Coordinate::new(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_course_identical_points_is_zero() {
        let p = Coordinate::new(44.9, -68.67);
        let bearing = course(p, p);
        assert_eq!(bearing, 0.0);
    }

    #[test]
    fn test_course_stays_in_range() {
        let pairs = [
            (Coordinate::new(45.0, -68.0), Coordinate::new(45.0000001, -68.0000001)),
            (Coordinate::new(-33.0, 151.0), Coordinate::new(-33.5, 150.5)),
            (Coordinate::new(10.0, 179.9), Coordinate::new(10.0, -179.9)),
        ];
        for (a, b) in pairs {
            let bearing = course(a, b);
            assert!((0.0..360.0).contains(&bearing), "bearing {} out of range", bearing);
        }
    }

    #[test]
    fn test_geodesic_distance_one_degree_of_latitude() {
        let d = geodesic_distance(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0));
        // WGS84 meridian arc from the equator to 1°N
        assert!((d - 110_574.0).abs() < 5.0, "got {}", d);
    }

    #[test]
    fn test_speed_over_ground_knots() {
        let a = Waypoint::new(0.0, 0.0, at(0));
        let b = Waypoint::new(1.0, 0.0, at(3600));
        let knots = speed_over_ground(&a, &b).unwrap();
        let expected = geodesic_distance(a.coordinate(), b.coordinate()) / 3600.0 / KNOT_MS;
        assert!((knots - expected).abs() < 1e-9);
        assert!((knots - 59.7).abs() < 0.1);
    }

    #[test]
    fn test_speed_over_ground_rejects_zero_interval() {
        let a = Waypoint::new(0.0, 0.0, at(10));
        let b = Waypoint::new(0.001, 0.0, at(10));
        assert!(matches!(
            speed_over_ground(&a, &b),
            Err(DzgError::DegenerateInterval { seconds: 0 })
        ));
        assert!(matches!(
            speed_over_ground(&b, &Waypoint::new(0.0, 0.0, at(5))),
            Err(DzgError::DegenerateInterval { seconds: -5 })
        ));
    }

    #[test]
    fn test_dd_to_dms_whole_minutes() {
        let dms = dd_to_dms(44.5);
        assert_eq!(dms.degrees, 44.0);
        assert_eq!(dms.minutes, 30.0);
        assert_eq!(dms.fraction, "00");
    }

    #[test]
    fn test_dd_to_dms_fractional_seconds() {
        let dms = dd_to_dms(1.0 + 2.0 / 60.0 + 30.5 / 3600.0);
        assert_eq!(dms.degrees, 1.0);
        assert_eq!(dms.minutes, 2.0);
        assert!(dms.fraction.starts_with("30"), "fraction {}", dms.fraction);
        assert!(!dms.fraction.contains('.'));
    }

    #[test]
    fn test_dd_to_dms_sign_only_on_degrees() {
        for x in [0.25, 12.3456, 68.6714, 179.999] {
            let pos = dd_to_dms(x);
            let neg = dd_to_dms(-x);
            assert_eq!(neg.degrees, -pos.degrees);
            assert_eq!(neg.minutes, pos.minutes);
            assert_eq!(neg.fraction, pos.fraction);
        }
    }

    #[test]
    fn test_track_profile() {
        let waypoints = vec![
            Waypoint::new(0.0, 0.0, at(0)),
            Waypoint::new(0.001, 0.0, at(10)),
            Waypoint::new(0.002, 0.0, at(10)),
        ];
        let profile = track_profile(&waypoints);
        assert_eq!(profile.distances.len(), 3);
        assert_eq!(profile.distances[0], 0.0);
        assert!(profile.distances[2] > profile.distances[1]);
        assert_eq!(profile.times, vec![0, 10, 10]);
        assert!(profile.speeds[0].unwrap() > 10.0);
        assert!(profile.speeds[1].is_none());
        assert!(track_profile(&[]).distances.is_empty());
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
    }
}
