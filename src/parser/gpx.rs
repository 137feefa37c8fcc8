//! GPX waypoint reading
//!
//! Marks are recorded as GPX waypoints (`<wpt>`), one per instrument mark.
//! Tracks and routes are ignored.

use crate::error::{DzgError, FileType, Result};
use crate::types::Waypoint;
use chrono::{DateTime, Utc};
use log::info;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Parse waypoints from any GPX source
pub fn parse_gpx<R: Read>(reader: R) -> Result<Vec<Waypoint>> {
    let gpx = ::gpx::read(reader)?;

    let mut waypoints = Vec::with_capacity(gpx.waypoints.len());
    for (index, wpt) in gpx.waypoints.iter().enumerate() {
        let time = wpt.time.as_ref().ok_or_else(|| {
            DzgError::format(FileType::Gpx, format!("waypoint {} has no time", index))
        })?;
        let iso = time.format().map_err(|e| DzgError::Time(e.to_string()))?;
        let point = wpt.point();
        waypoints.push(Waypoint::new(point.y(), point.x(), whole_seconds(&iso)?));
    }

    if waypoints.is_empty() {
        return Err(DzgError::format(
            FileType::Gpx,
            "no waypoints in file. please check GPX contents.",
        ));
    }
    Ok(waypoints)
}

// RFC 3339 text to UTC, truncated to the second
fn whole_seconds(iso: &str) -> Result<DateTime<Utc>> {
    let utc = DateTime::parse_from_rfc3339(iso)?.with_timezone(&Utc);
    DateTime::<Utc>::from_timestamp(utc.timestamp(), 0)
        .ok_or_else(|| DzgError::Time(format!("timestamp {} is out of range", iso)))
}

/// Read waypoints from a GPX file
pub fn read_gpx(path: &Path) -> Result<Vec<Waypoint>> {
    let file = File::open(path)?;
    let waypoints = parse_gpx(BufReader::new(file))?;
    info!("GPX read successful. marks: {}", waypoints.len());
    Ok(waypoints)
}
