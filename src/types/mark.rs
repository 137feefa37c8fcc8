use crate::error::{DzgError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which input encoding a mark sequence was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MarkSource {
    /// DZX with marks under `TargetGroup/TargetWayPt`, implicit scan 0 seeded
    DzxTargetGroup,
    /// DZX with marks under `File/Profile/WayPt`, no implicit start
    DzxFile,
    /// Marks detected in a DZT amplitude channel, start and end seeded
    Dzt,
}

impl MarkSource {
    /// Whether the reader seeds an implicit scan-0 start mark
    pub fn seeds_start(&self) -> bool {
        matches!(self, MarkSource::DzxTargetGroup | MarkSource::Dzt)
    }
}

/// Ordered instrument marks, one scan index per operator trigger
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MarkStore {
    pub source: MarkSource,
    pub scans: Vec<u64>,
}

impl MarkStore {
    pub fn new(source: MarkSource) -> Self {
        let scans = if source.seeds_start() {
            vec![0]
        } else {
            Vec::new()
        };
        Self { source, scans }
    }

    pub fn from_scans(source: MarkSource, scans: Vec<u64>) -> Self {
        Self { source, scans }
    }

    pub fn push(&mut self, scan: u64) {
        self.scans.push(scan);
    }

    pub fn len(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    /// Scan index of the last mark, i.e. the trace count for DZX files
    pub fn last_scan(&self) -> Option<u64> {
        self.scans.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &u64> {
        self.scans.iter()
    }

    /// Remove marks at the given ordinal positions.
    ///
    /// Negative positions count from the end (`-1` is the last mark). Every
    /// position is resolved against the length before removal, so
    /// `[0, -1]` removes the first and the last mark. Nothing is removed if
    /// any position is out of range.
    pub fn drop_indices(&mut self, positions: &[i64]) -> Result<()> {
        let len = self.scans.len();
        let mut resolved = Vec::with_capacity(positions.len());
        for &position in positions {
            resolved.push(resolve_position(position, len)?);
        }
        resolved.sort_unstable();
        resolved.dedup();
        for index in resolved.into_iter().rev() {
            self.scans.remove(index);
        }
        Ok(())
    }
}

fn resolve_position(position: i64, len: usize) -> Result<usize> {
    let len_i = len as i64;
    let index = if position < 0 { len_i + position } else { position };
    if index < 0 || index >= len_i {
        return Err(DzgError::Index { position, len });
    }
    Ok(index as usize)
}

/// Parse a comma-separated list of signed positions such as `0,-1` or `3, 5`
pub fn parse_drop_list(list: &str) -> Result<Vec<i64>> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<i64>()
                .map_err(|_| DzgError::DropList(format!("'{}' is not an integer", item)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(scans: &[u64]) -> MarkStore {
        MarkStore::from_scans(MarkSource::DzxTargetGroup, scans.to_vec())
    }

    #[test]
    fn test_new_store_seeds_start_per_source() {
        assert_eq!(MarkStore::new(MarkSource::DzxTargetGroup).scans, vec![0]);
        assert_eq!(MarkStore::new(MarkSource::Dzt).scans, vec![0]);
        assert!(MarkStore::new(MarkSource::DzxFile).is_empty());
    }

    #[test]
    fn test_drop_last_mark() {
        let mut marks = store(&[0, 120, 340, 500]);
        marks.drop_indices(&[-1]).unwrap();
        assert_eq!(marks.scans, vec![0, 120, 340]);
        assert_eq!(marks.last_scan(), Some(340));
    }

    #[test]
    fn test_drop_positions_resolve_against_original_length() {
        let mut marks = store(&[0, 10, 20, 30, 40]);
        marks.drop_indices(&[0, -1, 2]).unwrap();
        assert_eq!(marks.scans, vec![10, 30]);
    }

    #[test]
    fn test_drop_same_mark_twice_removes_once() {
        let mut marks = store(&[0, 10, 20]);
        marks.drop_indices(&[2, -1]).unwrap();
        assert_eq!(marks.scans, vec![0, 10]);
    }

    #[test]
    fn test_drop_out_of_range_leaves_store_untouched() {
        let mut marks = store(&[0, 10, 20]);
        let err = marks.drop_indices(&[1, 3]).unwrap_err();
        assert!(matches!(err, DzgError::Index { position: 3, len: 3 }));
        assert_eq!(marks.scans, vec![0, 10, 20]);

        let err = marks.drop_indices(&[-4]).unwrap_err();
        assert!(matches!(err, DzgError::Index { position: -4, .. }));
    }

    #[test]
    fn test_parse_drop_list() {
        assert_eq!(parse_drop_list("0,-1").unwrap(), vec![0, -1]);
        assert_eq!(parse_drop_list(" 3, 5 ,").unwrap(), vec![3, 5]);
        assert!(parse_drop_list("").unwrap().is_empty());
        assert!(matches!(
            parse_drop_list("1,x").unwrap_err(),
            DzgError::DropList(_)
        ));
    }
}
