//! gpx2dzg
//!
//! Fuses GPX waypoints recorded at instrument marks with the marks of a GSSI
//! ground-penetrating-radar recording (DZX or DZT) and writes a synthetic
//! DZG: one `$GSSIS` scan record and one `$GPRMC` fix per mark, which radar
//! processing software reads as if it were logged GPS.
//!
//! # Features
//!
//! - **`csv`** (default): Write the sanity-check table as CSV
//! - **`cli`** (default): Build the command-line interface binary
//! - **`json`**: Write the sanity-check report as JSON
//! - **`serde`**: Enable serialization/deserialization of types
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use gpx2dzg::{convert, ConvertOptions, WorldMagneticModel};
//!
//! let options = ConvertOptions::new("FILE____005.DZX");
//! let report = convert(&options, &WorldMagneticModel::default()).unwrap();
//! if let Some(path) = report.dzg_path {
//!     println!("Wrote {}", path.display());
//! } else {
//!     println!("{} marks vs {} waypoints", report.marks.len(), report.waypoints.len());
//! }
//! ```
//!
//! Working from parsed inputs:
//! ```rust,no_run
//! use gpx2dzg::{fuse, parse_dzx_str, parse_gpx, render_dzg, FixedVariation};
//!
//! let marks = parse_dzx_str(&std::fs::read_to_string("line.DZX").unwrap()).unwrap();
//! let waypoints = parse_gpx(std::fs::File::open("line.gpx").unwrap()).unwrap();
//! let pairs = fuse(&marks, &waypoints).unwrap();
//! print!("{}", render_dzg(&pairs, &FixedVariation(-15.0)).unwrap());
//! ```
//!
//! # Public API
//!
//! ## Reading
//! - [`read_marks`] - Read marks from a DZX or DZT file
//! - [`parse_dzx_str`] - Parse DZX marks, trying each known layout
//! - [`decode_dzt`] / [`marks_from_record`] - Decode a DZT and detect marks
//! - [`read_gpx`] / [`parse_gpx`] - Read GPX waypoints
//!
//! ## Fusion and output
//! - [`fuse`] - Join marks and waypoints by position
//! - [`nav_fixes`] - Derive speed, course and variation per mark
//! - [`export_to_dzg`] - Write the DZG without overwriting anything
//! - [`convert`] - The whole conversion, with sanity-check fallback
//!
//! ## Navigation
//! - [`geodesic_distance`], [`course`], [`speed_over_ground`], [`dd_to_dms`]

// Module declarations
pub mod conversion;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod fusion;
pub mod magnetic;
pub mod parser;
pub mod pipeline;
pub mod types;

#[allow(ambiguous_glob_reexports)]
pub use conversion::*;
pub use diagnostics::*;
pub use error::*;
pub use export::*;
pub use fusion::*;
pub use magnetic::*;
#[allow(ambiguous_glob_reexports)]
pub use parser::*;
pub use pipeline::*;
pub use types::*;
