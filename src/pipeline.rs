//! One-shot conversion: read both inputs, fuse, write the DZG or diagnostics

use crate::conversion::{mean, ms_to_knots, track_profile};
use crate::diagnostics::SanityReport;
use crate::error::{DzgError, Result};
use crate::export::export_to_dzg;
use crate::fusion::fuse;
use crate::magnetic::{FixedVariation, MagneticModel, WorldMagneticModel};
use crate::parser::{read_gpx, read_marks, DztPolicy};
use crate::types::{MarkStore, Waypoint};
use log::{info, warn};
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where the magnetic variation field comes from
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VariationSource {
    /// Built-in World Magnetic Model
    #[default]
    Model,
    /// Fixed declination in degrees, east positive
    Fixed(f64),
}

impl VariationSource {
    pub fn model(&self) -> Box<dyn MagneticModel> {
        match *self {
            VariationSource::Model => Box::new(WorldMagneticModel::default()),
            VariationSource::Fixed(degrees) => Box::new(FixedVariation(degrees)),
        }
    }
}

/// Conversion settings
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConvertOptions {
    /// DZX or DZT file; the DZG is written next to it
    pub instrument: PathBuf,
    /// GPX file, defaults to the instrument path with a `.gpx` extension
    pub gpx: Option<PathBuf>,
    pub write: bool,
    /// Produce the sanity check even when the counts match
    pub plot: bool,
    /// Mark positions to remove before fusing, negative from the end
    pub drop: Vec<i64>,
    pub dzt: DztPolicy,
    pub variation: VariationSource,
    /// Directory for diagnostic files, defaults to the instrument directory
    pub output_dir: Option<PathBuf>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            instrument: PathBuf::new(),
            gpx: None,
            write: true,
            plot: false,
            drop: Vec::new(),
            dzt: DztPolicy::default(),
            variation: VariationSource::default(),
            output_dir: None,
        }
    }
}

impl ConvertOptions {
    pub fn new(instrument: impl Into<PathBuf>) -> Self {
        Self {
            instrument: instrument.into(),
            ..Self::default()
        }
    }

    pub fn gpx_path(&self) -> PathBuf {
        self.gpx
            .clone()
            .unwrap_or_else(|| self.instrument.with_extension("gpx"))
    }
}

/// Outcome of a conversion that did not fail fatally
#[derive(Debug, Clone)]
pub struct ConversionReport {
    /// False when the counts did not match and no DZG was produced
    pub success: bool,
    pub marks: MarkStore,
    pub waypoints: Vec<Waypoint>,
    pub dzg_path: Option<PathBuf>,
    pub sanity: Option<SanityReport>,
    /// Diagnostic files written
    pub diagnostics: Vec<PathBuf>,
}

/// Run a conversion.
///
/// A mark count mismatch is not an error: the report comes back with
/// `success == false`, no DZG, and a sanity report. Format, index and
/// write failures are returned as errors.
pub fn convert(options: &ConvertOptions, model: &dyn MagneticModel) -> Result<ConversionReport> {
    let gpx_path = options.gpx_path();
    info!("instrument file: {}", options.instrument.display());
    info!("gpx file: {}", gpx_path.display());

    let mut marks = read_marks(&options.instrument, &options.dzt)?;
    info!("found {} instrument marks", marks.len());
    if !options.drop.is_empty() {
        marks.drop_indices(&options.drop)?;
        info!(
            "dropped positions {:?}, {} marks remain",
            options.drop,
            marks.len()
        );
    }

    let waypoints = read_gpx(&gpx_path)?;
    info!("found {} gpx marks", waypoints.len());

    let mut report = ConversionReport {
        success: false,
        marks,
        waypoints,
        dzg_path: None,
        sanity: None,
        diagnostics: Vec::new(),
    };

    let mut plot = options.plot;
    match fuse(&report.marks, &report.waypoints) {
        Ok(pairs) => {
            let speeds: Vec<f64> = track_profile(&report.waypoints)
                .speeds
                .into_iter()
                .flatten()
                .collect();
            info!("mean speed between marks: {:.1} kt", ms_to_knots(mean(&speeds)));
            if options.write {
                info!("outputting to DZG now (same directory and name as the instrument file)");
                report.dzg_path = Some(export_to_dzg(&options.instrument, &pairs, model)?);
            } else {
                info!("writing disabled, no DZG produced");
            }
            report.success = true;
        }
        Err(DzgError::Mismatch { .. }) => {
            warn!("foregoing output and generating sanity check instead");
            plot = true;
        }
        Err(e) => return Err(e),
    }

    if plot {
        let sanity = SanityReport::new(
            file_name(&options.instrument),
            file_name(&gpx_path),
            &report.marks,
            &report.waypoints,
        );
        for line in sanity.summary(72).lines() {
            info!("{}", line);
        }
        report.diagnostics = write_diagnostics(&sanity, options);
        report.sanity = Some(sanity);
    }

    Ok(report)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

// Diagnostic files are best effort: failing to write them never turns a
// mismatch into a fatal error.
#[allow(unused_variables, unused_mut)]
fn write_diagnostics(sanity: &SanityReport, options: &ConvertOptions) -> Vec<PathBuf> {
    let mut written = Vec::new();
    let output_dir = options.output_dir.as_deref();

    #[cfg(feature = "csv")]
    match crate::diagnostics::export_sanity_csv(sanity, &options.instrument, output_dir) {
        Ok(path) => written.push(path),
        Err(e) => warn!("could not write sanity check table: {}", e),
    }

    #[cfg(feature = "json")]
    match crate::diagnostics::export_sanity_json(sanity, &options.instrument, output_dir) {
        Ok(path) => written.push(path),
        Err(e) => warn!("could not write sanity check report: {}", e),
    }

    written
}
