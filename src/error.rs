use std::fmt;
use std::path::PathBuf;

/// Errors raised while reading marks and waypoints or writing a DZG
#[derive(Debug)]
pub enum DzgError {
    /// I/O errors
    Io(std::io::Error),
    /// Malformed DZX XML
    Xml(String),
    /// Malformed GPX document
    Gpx(String),
    /// Timestamp that cannot be represented
    Time(String),
    /// Unrecognized file structure, with the file type it concerns
    Format { file_type: FileType, message: String },
    /// Mark count differs from waypoint count
    Mismatch { marks: usize, waypoints: usize },
    /// Drop-list position outside the mark sequence
    Index { position: i64, len: usize },
    /// Drop list that is not a comma-separated list of integers
    DropList(String),
    /// Destination file cannot be created
    WritePermission { path: PathBuf, source: std::io::Error },
    /// Zero or negative elapsed time between two waypoints
    DegenerateInterval { seconds: i64 },
}

/// The input family an error message refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Dzx,
    Dzt,
    Gpx,
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::Dzx => write!(f, "DZX"),
            FileType::Dzt => write!(f, "DZT"),
            FileType::Gpx => write!(f, "GPX"),
        }
    }
}

impl DzgError {
    pub fn format(file_type: FileType, message: impl Into<String>) -> Self {
        DzgError::Format {
            file_type,
            message: message.into(),
        }
    }

    /// Process exit code for this error. Every fatal class exits with 2.
    pub fn exit_code(&self) -> i32 {
        2
    }

    /// True for errors the caller recovers from by producing diagnostics
    pub fn is_mismatch(&self) -> bool {
        matches!(self, DzgError::Mismatch { .. })
    }

    /// Follow-up advice printed after the error itself
    pub fn guidance(&self) -> Vec<String> {
        match self {
            DzgError::Format { file_type, .. } => vec![
                format!(
                    "please attach this {} to a new issue (https://github.com/iannesbitt/gpx2dzg/issues/new)",
                    file_type
                ),
                "        together with the output of this program, so the format can be assessed.".to_string(),
            ],
            DzgError::Xml(_) => vec![
                "the DZX is not well-formed XML. check that the file was copied completely.".to_string(),
            ],
            DzgError::Gpx(_) | DzgError::Time(_) => vec![
                "the GPX could not be read. check that it contains waypoints with times.".to_string(),
            ],
            DzgError::Index { len, .. } => vec![
                format!(
                    "drop positions must lie in -{len}..{len} (e.g. --drop=0,-1 drops the first and last mark)"
                ),
            ],
            DzgError::DropList(_) => vec![
                "usage: --drop=<n>[,<n>...] with signed integers, e.g. --drop=1,-2".to_string(),
            ],
            DzgError::WritePermission { .. } => vec![
                "could not write the file because you do not have write permission in this directory.".to_string(),
            ],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for DzgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DzgError::Io(err) => write!(f, "I/O error: {}", err),
            DzgError::Xml(msg) => write!(f, "XML error: {}", msg),
            DzgError::Gpx(msg) => write!(f, "GPX error: {}", msg),
            DzgError::Time(msg) => write!(f, "Time error: {}", msg),
            DzgError::Format { file_type, message } => {
                write!(f, "{} format error: {}", file_type, message)
            }
            DzgError::Mismatch { marks, waypoints } => write!(
                f,
                "Mark count mismatch: {} instrument marks vs {} GPX waypoints",
                marks, waypoints
            ),
            DzgError::Index { position, len } => write!(
                f,
                "Drop position {} is out of range for {} marks",
                position, len
            ),
            DzgError::DropList(msg) => write!(f, "Invalid drop list: {}", msg),
            DzgError::WritePermission { path, source } => {
                write!(f, "Cannot write {}: {}", path.display(), source)
            }
            DzgError::DegenerateInterval { seconds } => write!(
                f,
                "Degenerate time interval of {} s between waypoints",
                seconds
            ),
        }
    }
}

impl std::error::Error for DzgError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DzgError::Io(err) => Some(err),
            DzgError::WritePermission { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DzgError {
    fn from(err: std::io::Error) -> Self {
        DzgError::Io(err)
    }
}

impl From<quick_xml::Error> for DzgError {
    fn from(err: quick_xml::Error) -> Self {
        DzgError::Xml(err.to_string())
    }
}

impl From<gpx::errors::GpxError> for DzgError {
    fn from(err: gpx::errors::GpxError) -> Self {
        DzgError::Gpx(err.to_string())
    }
}

impl From<chrono::ParseError> for DzgError {
    fn from(err: chrono::ParseError) -> Self {
        DzgError::Time(err.to_string())
    }
}

#[cfg(feature = "csv")]
impl From<csv::Error> for DzgError {
    fn from(err: csv::Error) -> Self {
        DzgError::Io(err.into())
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for DzgError {
    fn from(err: serde_json::Error) -> Self {
        DzgError::Io(err.into())
    }
}

pub type Result<T> = std::result::Result<T, DzgError>;
