use crate::types::Waypoint;
use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A mark joined with the waypoint at the same position in its sequence
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FusedPair {
    pub index: usize,
    pub scan: u64,
    pub waypoint: Waypoint,
}

/// Coordinate split into whole degrees, whole minutes and the seconds digits
/// that the DZG writes as the fractional part of the minutes field
#[derive(Debug, Clone, PartialEq)]
pub struct Dms {
    pub degrees: f64,
    pub minutes: f64,
    pub fraction: String,
}

/// Navigation fix derived for one fused pair
#[derive(Debug, Clone, PartialEq)]
pub struct NavFix {
    pub scan: u64,
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Knots
    pub speed: f64,
    /// Degrees true, [0, 360)
    pub course: f64,
    /// Degrees, east positive
    pub variation: f64,
}
