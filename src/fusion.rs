//! Positional join of instrument marks and GPX waypoints
//!
//! The two recorders are assumed to have been triggered in lockstep, so
//! mark `i` belongs to waypoint `i`. There is no partial join: differing
//! counts are an error and the caller falls back to diagnostics.

use crate::error::{DzgError, Result};
use crate::types::{FusedPair, MarkStore, Waypoint};
use log::{info, warn};

pub fn fuse(marks: &MarkStore, waypoints: &[Waypoint]) -> Result<Vec<FusedPair>> {
    if marks.len() != waypoints.len() {
        warn!(
            "mark counts do not match: {} instrument marks, {} GPX waypoints",
            marks.len(),
            waypoints.len()
        );
        return Err(DzgError::Mismatch {
            marks: marks.len(),
            waypoints: waypoints.len(),
        });
    }

    info!("mark counts match! ({} marks)", marks.len());
    Ok(marks
        .iter()
        .zip(waypoints)
        .enumerate()
        .map(|(index, (&scan, waypoint))| FusedPair {
            index,
            scan,
            waypoint: waypoint.clone(),
        })
        .collect())
}
