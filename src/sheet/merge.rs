// src/sheet/merge.rs

use super::LayoutWarning;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};
use umya_spreadsheet::Worksheet;
use umya_spreadsheet::helper::coordinate::{column_index_from_string, string_from_column_index};

/// Rectangular span of cells rendered as one; content lives in the top-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergeRange {
    pub first_col: u32,
    pub first_row: u32,
    pub last_col: u32,
    pub last_row: u32,
}

impl MergeRange {
    pub fn new(first_col: u32, first_row: u32, last_col: u32, last_row: u32) -> Self {
        Self {
            first_col: first_col.min(last_col),
            first_row: first_row.min(last_row),
            last_col: first_col.max(last_col),
            last_row: first_row.max(last_row),
        }
    }

    /// Single-row span from `first_col` to `last_col`.
    pub fn row_span(row: u32, first_col: u32, last_col: u32) -> Self {
        Self::new(first_col, row, last_col, row)
    }

    pub fn touches_row(&self, row: u32) -> bool {
        self.first_row <= row && row <= self.last_row
    }

    pub fn contains(&self, col: u32, row: u32) -> bool {
        self.touches_row(row) && self.first_col <= col && col <= self.last_col
    }

    pub fn overlaps(&self, other: &MergeRange) -> bool {
        self.first_col <= other.last_col
            && other.first_col <= self.last_col
            && self.first_row <= other.last_row
            && other.first_row <= self.last_row
    }

    pub fn is_top_left(&self, col: u32, row: u32) -> bool {
        col == self.first_col && row == self.first_row
    }
}

impl fmt::Display for MergeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}{}",
            string_from_column_index(&self.first_col),
            self.first_row,
            string_from_column_index(&self.last_col),
            self.last_row
        )
    }
}

impl FromStr for MergeRange {
    type Err = LayoutWarning;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LayoutWarning::InvalidRange(s.to_string());
        let mut parts = s.trim().split(':');
        let start = parts.next().ok_or_else(invalid)?;
        let end = parts.next().unwrap_or(start);
        if parts.next().is_some() {
            return Err(invalid());
        }
        let (c0, r0) = parse_cell_ref(start).ok_or_else(invalid)?;
        let (c1, r1) = parse_cell_ref(end).ok_or_else(invalid)?;
        Ok(MergeRange::new(c0, r0, c1, r1))
    }
}

/// `"$J$14"` / `"J14"` → `(10, 14)`.
fn parse_cell_ref(s: &str) -> Option<(u32, u32)> {
    let s = s.replace('$', "");
    let split = s.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = s.split_at(split);
    if letters.is_empty() || letters.len() > 3 || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    let letters = letters.to_ascii_uppercase();
    let col = column_index_from_string(&letters);
    Some((col, row))
}

/// Snapshot of the sheet's merge list.
///
/// Entries that do not parse are reported separately instead of being dropped
/// silently.
pub fn merged_ranges(sheet: &Worksheet) -> (Vec<MergeRange>, Vec<String>) {
    let mut ranges = Vec::new();
    let mut invalid = Vec::new();
    for range in sheet.get_merge_cells() {
        let raw = range.get_range();
        match raw.parse::<MergeRange>() {
            Ok(r) => ranges.push(r),
            Err(_) => invalid.push(raw),
        }
    }
    (ranges, invalid)
}

/// Merge that covers `(col, row)`, if any.
pub(crate) fn covering_merge(sheet: &Worksheet, col: u32, row: u32) -> Option<MergeRange> {
    merged_ranges(sheet)
        .0
        .into_iter()
        .find(|r| r.contains(col, row))
}

/// Dissolve every merge whose rows include `row`.
///
/// Works on a snapshot of the merge list. Ranges that are already gone or do
/// not parse are skipped, so a second call on the same row changes nothing.
/// Returns the ranges that were actually dissolved.
pub fn dissolve_merges_touching(sheet: &mut Worksheet, row: u32) -> Vec<MergeRange> {
    let (snapshot, invalid) = merged_ranges(sheet);
    for raw in &invalid {
        debug!(range = %raw, row, "Skipping unparseable merge range");
    }

    let mut dissolved = Vec::new();
    for range in snapshot.into_iter().filter(|r| r.touches_row(row)) {
        let before = sheet.get_merge_cells().len();
        sheet
            .get_merge_cells_mut()
            .retain(|m| m.get_range().parse::<MergeRange>().ok() != Some(range));
        if sheet.get_merge_cells().len() < before {
            info!(range = %range, row, "Unmerged range");
            dissolved.push(range);
        }
    }
    dissolved
}

/// Dissolve every merge that shares at least one cell with `range`.
pub fn dissolve_merges_overlapping(sheet: &mut Worksheet, range: MergeRange) -> Vec<MergeRange> {
    let (snapshot, _) = merged_ranges(sheet);
    let stale: Vec<MergeRange> = snapshot.into_iter().filter(|r| r.overlaps(&range)).collect();
    if !stale.is_empty() {
        sheet
            .get_merge_cells_mut()
            .retain(|m| match m.get_range().parse::<MergeRange>() {
                Ok(r) => !stale.contains(&r),
                Err(_) => true,
            });
        info!(range = %range, dissolved = stale.len(), "Unmerged ranges overlapping box");
    }
    stale
}

/// Merge `range`, refusing to stack it on top of an existing merge.
///
/// Re-merging exactly the same range is accepted as a no-op.
pub fn merge_cells(sheet: &mut Worksheet, range: MergeRange) -> Result<(), LayoutWarning> {
    let (existing, _) = merged_ranges(sheet);
    if existing.contains(&range) {
        return Ok(());
    }
    if let Some(conflict) = existing.iter().find(|r| r.overlaps(&range)) {
        return Err(LayoutWarning::MergeConflict {
            requested: range,
            existing: *conflict,
        });
    }
    sheet.add_merge_cells(range.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> umya_spreadsheet::Spreadsheet {
        umya_spreadsheet::new_file()
    }

    #[test]
    fn test_parse_and_display() {
        let r: MergeRange = "I4:L9".parse().unwrap();
        assert_eq!(r, MergeRange::new(9, 4, 12, 9));
        assert_eq!(r.to_string(), "I4:L9");

        let single: MergeRange = "$B$2".parse().unwrap();
        assert_eq!(single, MergeRange::new(2, 2, 2, 2));

        assert!("".parse::<MergeRange>().is_err());
        assert!("A0:B2".parse::<MergeRange>().is_err());
        assert!("12:14".parse::<MergeRange>().is_err());
        assert!("A1:B2:C3".parse::<MergeRange>().is_err());
    }

    #[test]
    fn test_touches_row_is_inclusive() {
        let r = MergeRange::new(10, 16, 11, 19);
        assert!(!r.touches_row(15));
        assert!(r.touches_row(16));
        assert!(r.touches_row(19));
        assert!(!r.touches_row(20));
        assert!(r.is_top_left(10, 16));
        assert!(!r.is_top_left(11, 16));
    }

    #[test]
    fn test_dissolve_on_row_without_merges() {
        let mut book = sheet();
        let ws = book.get_active_sheet_mut();
        ws.add_merge_cells("A1:B1");
        assert!(dissolve_merges_touching(ws, 5).is_empty());
        assert_eq!(ws.get_merge_cells().len(), 1);
    }

    #[test]
    fn test_dissolve_twice_is_noop() {
        let mut book = sheet();
        let ws = book.get_active_sheet_mut();
        ws.add_merge_cells("J4:K7");
        ws.add_merge_cells("A1:L1");

        let first = dissolve_merges_touching(ws, 6);
        assert_eq!(first, vec![MergeRange::new(10, 4, 11, 7)]);
        let second = dissolve_merges_touching(ws, 6);
        assert!(second.is_empty());

        let (left, _) = merged_ranges(ws);
        assert_eq!(left, vec![MergeRange::new(1, 1, 12, 1)]);
    }

    #[test]
    fn test_dissolve_many_ranges_on_one_row() {
        let mut book = sheet();
        let ws = book.get_active_sheet_mut();
        ws.add_merge_cells("A3:B3");
        ws.add_merge_cells("C3:D3");
        ws.add_merge_cells("E2:F4");
        ws.add_merge_cells("G5:H5");

        assert_eq!(dissolve_merges_touching(ws, 3).len(), 3);
        assert_eq!(ws.get_merge_cells().len(), 1);
    }

    #[test]
    fn test_merge_refuses_overlap() {
        let mut book = sheet();
        let ws = book.get_active_sheet_mut();
        merge_cells(ws, MergeRange::row_span(14, 9, 12)).unwrap();
        // same range again is fine
        merge_cells(ws, MergeRange::row_span(14, 9, 12)).unwrap();
        assert_eq!(ws.get_merge_cells().len(), 1);

        let err = merge_cells(ws, MergeRange::new(10, 14, 11, 15)).unwrap_err();
        assert!(matches!(err, LayoutWarning::MergeConflict { .. }));

        dissolve_merges_touching(ws, 14);
        merge_cells(ws, MergeRange::new(10, 14, 11, 15)).unwrap();
        assert_eq!(covering_merge(ws, 11, 15), Some(MergeRange::new(10, 14, 11, 15)));
    }

    #[test]
    fn test_dissolve_overlapping_keeps_neighbours() {
        let mut book = sheet();
        let ws = book.get_active_sheet_mut();
        ws.add_merge_cells("I4:L6");
        ws.add_merge_cells("J8:K9");
        ws.add_merge_cells("A4:B4");
        let gone = dissolve_merges_overlapping(ws, "I4:L9".parse().unwrap());
        assert_eq!(gone.len(), 2);
        let (left, _) = merged_ranges(ws);
        assert_eq!(left, vec![MergeRange::row_span(4, 1, 2)]);
    }
}
