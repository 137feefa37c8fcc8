//! DZG export
//!
//! A DZG holds two records per mark: a `$GSSIS` line carrying the scan
//! number and a `$GPRMC` sentence carrying the fused position, followed by
//! two blank lines. Field widths are fixed; radar processing software reads
//! them positionally.

use crate::conversion::{course, dd_to_dms, speed_over_ground};
use crate::error::{DzgError, Result};
use crate::magnetic::MagneticModel;
use crate::types::{FusedPair, NavFix, Waypoint};
use log::{info, warn};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Suffix added to the DZG name when a DZG of the plain name already exists
pub const DZG_SUFFIX: &str = "-gpx2dzg";

/// XOR of every byte between `$` and `*`
pub fn nmea_checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}

impl NavFix {
    /// Sentence text between `$` and `*`
    pub fn rmc_body(&self) -> String {
        let lat = dd_to_dms(self.latitude.abs());
        let lon = dd_to_dms(self.longitude.abs());
        let lat_hemisphere = if self.latitude >= 0.0 { 'N' } else { 'S' };
        let lon_hemisphere = if self.longitude >= 0.0 { 'E' } else { 'W' };
        let variation_hemisphere = if self.variation >= 0.0 { 'E' } else { 'W' };

        format!(
            "GPRMC,{},A,{:02}{:02}.{},{},{:03}{:02}.{},{},{:05.1},{:05.1},{},{:05.1},{}",
            self.time.format("%H%M%S"),
            lat.degrees as i64,
            lat.minutes as i64,
            lat.fraction,
            lat_hemisphere,
            lon.degrees as i64,
            lon.minutes as i64,
            lon.fraction,
            lon_hemisphere,
            self.speed,
            self.course,
            self.time.format("%d%m%y"),
            self.variation.abs(),
            variation_hemisphere,
        )
    }
}

impl fmt::Display for NavFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self.rmc_body();
        write!(f, "${}*{:02X}", body, nmea_checksum(&body))
    }
}

/// Derive the navigation fix of every fused pair.
///
/// The first pair has no predecessor: its speed is taken towards the second
/// pair and its course is 0. Later pairs use the preceding pair. A speed
/// over a zero-length time interval is written as 0.
pub fn nav_fixes(pairs: &[FusedPair], model: &dyn MagneticModel) -> Vec<NavFix> {
    let mut fixes = Vec::with_capacity(pairs.len());
    for (m, pair) in pairs.iter().enumerate() {
        let here = &pair.waypoint;
        let (speed, bearing) = if m == 0 {
            let speed = match pairs.get(1) {
                Some(next) => checked_speed(here, &next.waypoint, m),
                None => {
                    warn!("only one mark: speed over ground written as 0");
                    0.0
                }
            };
            (speed, 0.0)
        } else {
            let previous = &pairs[m - 1].waypoint;
            (
                checked_speed(previous, here, m),
                course(previous.coordinate(), here.coordinate()),
            )
        };

        fixes.push(NavFix {
            scan: pair.scan,
            time: here.time,
            latitude: here.latitude,
            longitude: here.longitude,
            speed,
            course: bearing,
            variation: model.declination(here.coordinate(), here.time),
        });
    }
    fixes
}

fn checked_speed(from: &Waypoint, to: &Waypoint, mark: usize) -> f64 {
    match speed_over_ground(from, to) {
        Ok(knots) => knots,
        Err(e) => {
            warn!("mark {}: {}; speed over ground written as 0", mark, e);
            0.0
        }
    }
}

/// Write the DZG records for `fixes` to `sink`
pub fn encode_dzg<W: Write>(fixes: &[NavFix], mut sink: W) -> std::io::Result<()> {
    for fix in fixes {
        writeln!(sink, "$GSSIS,{},-1", fix.scan)?;
        write!(sink, "{}\n\n\n", fix)?;
    }
    sink.flush()
}

/// Render the complete DZG text for a fused sequence
pub fn render_dzg(pairs: &[FusedPair], model: &dyn MagneticModel) -> Result<String> {
    let mut buffer = Vec::new();
    encode_dzg(&nav_fixes(pairs, model), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| DzgError::Io(std::io::Error::new(ErrorKind::InvalidData, e)))
}

/// DZG path next to the instrument file that does not exist yet.
///
/// `<dir>/<stem>.DZG`, or `<stem>-gpx2dzg.DZG`, `<stem>-gpx2dzg-2.DZG`, ...
/// when earlier names are taken.
pub fn compute_dzg_path(instrument_path: &Path) -> PathBuf {
    let plain = instrument_path.with_extension("DZG");
    if !plain.exists() {
        return plain;
    }
    let stem = instrument_path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");
    let dir = instrument_path.parent().unwrap_or_else(|| Path::new(""));

    let mut attempt = 1;
    loop {
        let name = if attempt == 1 {
            format!("{}{}.DZG", stem, DZG_SUFFIX)
        } else {
            format!("{}{}-{}.DZG", stem, DZG_SUFFIX, attempt)
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        attempt += 1;
    }
}

fn create_new(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

fn write_error(path: &Path, e: std::io::Error) -> DzgError {
    match e.kind() {
        ErrorKind::PermissionDenied | ErrorKind::ReadOnlyFilesystem => DzgError::WritePermission {
            path: path.to_path_buf(),
            source: e,
        },
        _ => DzgError::Io(e),
    }
}

/// Write `contents` to the file `open` creates at `path`.
///
/// A failed write removes whatever was created, so no partial DZG is
/// left behind.
pub fn write_new_file<W, F>(path: &Path, contents: &[u8], open: F) -> Result<()>
where
    W: Write,
    F: FnOnce(&Path) -> std::io::Result<W>,
{
    let mut file = open(path).map_err(|e| write_error(path, e))?;
    if let Err(e) = file.write_all(contents).and_then(|_| file.flush()) {
        drop(file);
        if let Err(cleanup) = std::fs::remove_file(path) {
            warn!("could not remove partial file {}: {}", path.display(), cleanup);
        }
        return Err(write_error(path, e));
    }
    Ok(())
}

/// Write the DZG for `pairs` next to `instrument_path` and return its path.
///
/// The whole file is rendered before the destination is created. An
/// existing file is never overwritten and a failed write removes the
/// partial file.
pub fn export_to_dzg(
    instrument_path: &Path,
    pairs: &[FusedPair],
    model: &dyn MagneticModel,
) -> Result<PathBuf> {
    let contents = render_dzg(pairs, model)?;
    let path = compute_dzg_path(instrument_path);
    if path != instrument_path.with_extension("DZG") {
        info!("a DZG already exists. saving as {}", path.display());
    }

    write_new_file(&path, contents.as_bytes(), create_new)?;
    info!("output file: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::magnetic::FixedVariation;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(seconds)
    }

    fn pairs(points: &[(u64, f64, f64, i64)]) -> Vec<FusedPair> {
        points
            .iter()
            .enumerate()
            .map(|(index, &(scan, lat, lon, t))| FusedPair {
                index,
                scan,
                waypoint: Waypoint::new(lat, lon, at(t)),
            })
            .collect()
    }

    /// Split a sentence into its fields, checking the checksum on the way
    fn rmc_fields(sentence: &str) -> Vec<String> {
        let inner = sentence.strip_prefix('$').unwrap();
        let (body, checksum) = inner.split_once('*').unwrap();
        assert_eq!(checksum, format!("{:02X}", nmea_checksum(body)));
        body.split(',').map(str::to_string).collect()
    }

    fn coordinate(field: &str, hemisphere: &str, degree_digits: usize) -> f64 {
        let degrees: f64 = field[..degree_digits].parse().unwrap();
        let minutes: f64 = field[degree_digits..].parse().unwrap();
        let value = degrees + minutes / 60.0;
        if hemisphere == "S" || hemisphere == "W" {
            -value
        } else {
            value
        }
    }

    #[test]
    fn test_checksum() {
        // Reference sentence from the NMEA 0183 documentation
        let body = "GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W";
        assert_eq!(nmea_checksum(body), 0x6A);
    }

    #[test]
    fn test_rmc_field_layout() {
        let fix = NavFix {
            scan: 120,
            time: Utc.with_ymd_and_hms(2019, 3, 7, 9, 5, 3).unwrap(),
            latitude: -33.5,
            longitude: 151.25,
            speed: 3.26,
            course: 87.04,
            variation: -12.34,
        };
        let fields = rmc_fields(&fix.to_string());
        assert_eq!(
            fields,
            vec![
                "GPRMC", "090503", "A", "3330.00", "S", "15115.00", "E", "003.3", "087.0",
                "070319", "012.3", "W"
            ]
        );
    }

    #[test]
    fn test_first_pair_course_is_zero_and_speed_looks_ahead() {
        let fused = pairs(&[
            (0, 44.9, -68.67, 0),
            (120, 44.9009, -68.67, 10),
            (340, 44.9009, -68.6687, 20),
        ]);
        let fixes = nav_fixes(&fused, &FixedVariation(0.0));
        assert_eq!(fixes[0].course, 0.0);
        assert!((fixes[0].speed - fixes[1].speed).abs() < 1e-9);
        assert!(fixes[1].course < 1.0 || fixes[1].course > 359.0);
        assert!((fixes[2].course - 90.0).abs() < 1.0);
    }

    #[test]
    fn test_degenerate_interval_writes_zero_speed() {
        let fused = pairs(&[(0, 45.0, -68.0, 0), (10, 45.001, -68.0, 0)]);
        let fixes = nav_fixes(&fused, &FixedVariation(0.0));
        assert_eq!(fixes[0].speed, 0.0);
        assert_eq!(fixes[1].speed, 0.0);
    }

    #[test]
    fn test_single_pair() {
        let fused = pairs(&[(0, 45.0, -68.0, 0)]);
        let text = render_dzg(&fused, &FixedVariation(1.0)).unwrap();
        assert!(text.starts_with("$GSSIS,0,-1\n$GPRMC,"));
        assert!(text.contains(",000.0,000.0,"));
    }

    #[test]
    fn test_encoded_layout_and_round_trip() {
        let fused = pairs(&[
            (0, 44.9, -68.67, 0),
            (120, 44.9009, -68.67, 10),
            (340, 44.9009, -68.6687, 20),
        ]);
        let model = FixedVariation(-15.2);
        let fixes = nav_fixes(&fused, &model);
        let text = render_dzg(&fused, &model).unwrap();

        let records: Vec<&str> = text.split("\n\n\n").filter(|r| !r.is_empty()).collect();
        assert_eq!(records.len(), 3);
        for (record, fix) in records.iter().zip(&fixes) {
            let mut lines = record.lines();
            assert_eq!(lines.next().unwrap(), format!("$GSSIS,{},-1", fix.scan));
            let fields = rmc_fields(lines.next().unwrap());
            assert!(lines.next().is_none());

            let lat = coordinate(&fields[3], &fields[4], 2);
            let lon = coordinate(&fields[5], &fields[6], 3);
            assert_eq!(format!("{:.1}", lat), format!("{:.1}", fix.latitude));
            assert_eq!(format!("{:.1}", lon), format!("{:.1}", fix.longitude));
            assert_eq!(fields[7], format!("{:05.1}", fix.speed));
            assert_eq!(fields[8], format!("{:05.1}", fix.course));
            assert_eq!(fields[10], "015.2");
            assert_eq!(fields[11], "W");
        }
        assert!(text.ends_with("\n\n\n"));
    }

    #[test]
    fn test_compute_dzg_path_never_reuses_a_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let dzx = dir.path().join("FILE____005.DZX");

        let first = compute_dzg_path(&dzx);
        assert_eq!(first, dir.path().join("FILE____005.DZG"));
        std::fs::write(&first, "x").unwrap();

        let second = compute_dzg_path(&dzx);
        assert_eq!(second, dir.path().join("FILE____005-gpx2dzg.DZG"));
        std::fs::write(&second, "x").unwrap();

        assert_eq!(
            compute_dzg_path(&dzx),
            dir.path().join("FILE____005-gpx2dzg-2.DZG")
        );
    }

    #[test]
    fn test_export_keeps_existing_dzg() {
        let dir = tempfile::TempDir::new().unwrap();
        let dzx = dir.path().join("line.DZX");
        std::fs::write(dir.path().join("line.DZG"), "original").unwrap();

        let fused = pairs(&[(0, 45.0, -68.0, 0), (50, 45.001, -68.0, 5)]);
        let path = export_to_dzg(&dzx, &fused, &FixedVariation(0.0)).unwrap();
        assert_eq!(path, dir.path().join("line-gpx2dzg.DZG"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("line.DZG")).unwrap(),
            "original"
        );
        assert!(std::fs::read_to_string(path).unwrap().contains("$GSSIS,50,-1"));
    }

    // Writes a few bytes of every buffer and then fails
    struct FailingWriter {
        inner: File,
        kind: ErrorKind,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.inner.write_all(&buf[..buf.len().min(8)])?;
            Err(std::io::Error::new(self.kind, "device stopped accepting writes"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_unopenable_destination_is_write_permission_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("line.DZG");
        let err = write_new_file(&path, b"$GSSIS,0,-1\n", |_: &Path| -> std::io::Result<File> {
            Err(std::io::Error::new(ErrorKind::PermissionDenied, "denied"))
        })
        .unwrap_err();

        match &err {
            DzgError::WritePermission { path: failed, .. } => assert_eq!(failed, &path),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.guidance()[0].contains("write permission"));
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_write_removes_partial_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("line.DZG");
        let fused = pairs(&[(0, 45.0, -68.0, 0), (50, 45.001, -68.0, 5)]);
        let contents = render_dzg(&fused, &FixedVariation(0.0)).unwrap();

        let err = write_new_file(&path, contents.as_bytes(), |p: &Path| {
            create_new(p).map(|inner| FailingWriter {
                inner,
                kind: ErrorKind::ReadOnlyFilesystem,
            })
        })
        .unwrap_err();

        assert!(matches!(err, DzgError::WritePermission { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_other_write_failures_stay_io_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("line.DZG");
        let err = write_new_file(&path, b"data", |p: &Path| {
            create_new(p).map(|inner| FailingWriter {
                inner,
                kind: ErrorKind::Other,
            })
        })
        .unwrap_err();

        assert!(matches!(err, DzgError::Io(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_new_file_refuses_existing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("line.DZG");
        std::fs::write(&path, "original").unwrap();

        let err = write_new_file(&path, b"new", create_new).unwrap_err();
        assert!(matches!(err, DzgError::Io(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }
}
