use crate::error::{DzgError, FileType, Result};
use crate::parser::dzt::{read_dzt, DztPolicy};
use crate::parser::dzx::read_dzx;
use crate::types::MarkStore;
use std::path::Path;

/// Instrument mark file kinds, by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentFile {
    Dzx,
    Dzt,
}

impl InstrumentFile {
    /// Classify a path by its extension, case-insensitive
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "dzx" => Some(InstrumentFile::Dzx),
            "dzt" => Some(InstrumentFile::Dzt),
            _ => None,
        }
    }
}

/// Read the marks of a DZX or DZT file
pub fn read_marks(path: &Path, policy: &DztPolicy) -> Result<MarkStore> {
    match InstrumentFile::from_path(path) {
        Some(InstrumentFile::Dzx) => read_dzx(path),
        Some(InstrumentFile::Dzt) => read_dzt(path, policy),
        None => Err(DzgError::format(
            FileType::Dzx,
            format!(
                "{} is neither a .DZX nor a .DZT file",
                path.display()
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_file_from_extension() {
        assert_eq!(
            InstrumentFile::from_path(Path::new("/data/FILE____005.DZX")),
            Some(InstrumentFile::Dzx)
        );
        assert_eq!(
            InstrumentFile::from_path(Path::new("line.dzt")),
            Some(InstrumentFile::Dzt)
        );
        assert_eq!(InstrumentFile::from_path(Path::new("track.gpx")), None);
        assert_eq!(InstrumentFile::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_read_marks_rejects_other_extensions() {
        let err = read_marks(Path::new("marks.txt"), &DztPolicy::default()).unwrap_err();
        assert!(matches!(err, DzgError::Format { .. }));
    }
}
