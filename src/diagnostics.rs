//! Sanity-check output for mark streams that do not line up
//!
//! When mark and waypoint counts differ (or when asked), the two sequences
//! are laid side by side: cumulative GPX distance against DZX/DZT scan
//! number. Comparing the spacing usually shows which mark was missed or
//! doubled, which is what the drop list is for.

use crate::conversion::track_profile;
use crate::types::{MarkStore, Waypoint};
use std::path::{Path, PathBuf};

#[cfg(any(feature = "csv", feature = "json"))]
use crate::error::Result;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Both mark sequences, ready for comparison
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SanityReport {
    pub dzx_name: String,
    pub gpx_name: String,
    pub scans: Vec<u64>,
    /// Meters from the first waypoint
    pub distances: Vec<f64>,
    /// Whole seconds from the first waypoint
    pub elapsed: Vec<i64>,
}

impl SanityReport {
    pub fn new(
        dzx_name: impl Into<String>,
        gpx_name: impl Into<String>,
        marks: &MarkStore,
        waypoints: &[Waypoint],
    ) -> Self {
        let profile = track_profile(waypoints);
        Self {
            dzx_name: dzx_name.into(),
            gpx_name: gpx_name.into(),
            scans: marks.scans.clone(),
            distances: profile.distances,
            elapsed: profile.times,
        }
    }

    /// Two text number lines, GPX distance above DZX scan number
    pub fn summary(&self, width: usize) -> String {
        let scans: Vec<f64> = self.scans.iter().map(|&s| s as f64).collect();
        format!(
            "{} marks - count: {}\n{}\ndistance (m): 0 .. {:.1}\n{} marks - count: {}\n{}\nscan number: 0 .. {}",
            self.gpx_name,
            self.distances.len(),
            number_line(&self.distances, width),
            self.distances.last().copied().unwrap_or(0.0),
            self.dzx_name,
            self.scans.len(),
            number_line(&scans, width),
            self.scans.last().copied().unwrap_or(0),
        )
    }

    /// Rows of (index, scan, distance, elapsed), padded where one side is shorter
    pub fn rows(&self) -> Vec<(usize, Option<u64>, Option<f64>, Option<i64>)> {
        let count = self.scans.len().max(self.distances.len());
        (0..count)
            .map(|i| {
                (
                    i,
                    self.scans.get(i).copied(),
                    self.distances.get(i).copied(),
                    self.elapsed.get(i).copied(),
                )
            })
            .collect()
    }
}

/// Positions of `values` on a line of `width` characters scaled to the largest value
pub fn number_line(values: &[f64], width: usize) -> String {
    let width = width.max(2);
    let mut line = vec!['-'; width];
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    for &value in values {
        let position = if max > 0.0 {
            ((value / max) * (width - 1) as f64).round() as usize
        } else {
            0
        };
        line[position.min(width - 1)] = '|';
    }
    line.into_iter().collect()
}

/// Diagnostic file path `<dir>/<stem>.sanity.<ext>`
pub fn sanity_path(instrument_path: &Path, output_dir: Option<&Path>, ext: &str) -> PathBuf {
    let stem = instrument_path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| instrument_path.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{}.sanity.{}", stem, ext))
}

/// Write the report as CSV and return the file path
#[cfg(feature = "csv")]
pub fn export_sanity_csv(
    report: &SanityReport,
    instrument_path: &Path,
    output_dir: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
    }
    let path = sanity_path(instrument_path, output_dir, "csv");
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(["index", "scan", "distance_m", "elapsed_s"])?;
    for (index, scan, distance, elapsed) in report.rows() {
        writer.write_record([
            index.to_string(),
            scan.map(|s| s.to_string()).unwrap_or_default(),
            distance.map(|d| format!("{:.3}", d)).unwrap_or_default(),
            elapsed.map(|e| e.to_string()).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    log::info!("sanity check table: {}", path.display());
    Ok(path)
}

/// Write the report as JSON and return the file path
#[cfg(feature = "json")]
pub fn export_sanity_json(
    report: &SanityReport,
    instrument_path: &Path,
    output_dir: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
    }
    let path = sanity_path(instrument_path, output_dir, "json");
    let file = std::fs::File::create(&path)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), report)?;
    log::info!("sanity check report: {}", path.display());
    Ok(path)
}
