// src/sheet/style.rs

use super::LayoutWarning;
use super::layout::{INVOICE_MARKER_ARGB, INVOICE_MARKER_COL};
use super::merge::covering_merge;
use std::ops::RangeInclusive;
use tracing::debug;
use umya_spreadsheet::{Border, Style, Worksheet};

/// Copy cell formatting and row height from `source_row` to `target_row`.
///
/// Styles are cloned by value, so later edits on the target never reach the
/// source. Columns that cannot take a style (covered by someone else's merge)
/// are skipped and reported; the rest of the row is still copied. The invoicing
/// column is always given its red fill, whatever the source looks like.
pub fn copy_style(
    sheet: &mut Worksheet,
    source_row: u32,
    target_row: u32,
    columns: RangeInclusive<u32>,
) -> Vec<LayoutWarning> {
    let mut warnings = Vec::new();
    if source_row == 0 || target_row == 0 {
        warnings.push(LayoutWarning::RowOutOfRange(source_row.min(target_row)));
        return warnings;
    }

    if let Some(height) = sheet
        .get_row_dimension(&source_row)
        .map(|r| *r.get_height())
        .filter(|h| *h > 0.0)
    {
        sheet.get_row_dimension_mut(&target_row).set_height(height);
    }

    for col in columns {
        let Some(style) = sheet.get_cell((col, source_row)).map(|c| c.get_style().clone()) else {
            continue;
        };
        if let Some(range) = covering_merge(sheet, col, target_row) {
            if !range.is_top_left(col, target_row) {
                debug!(col, row = target_row, range = %range, "Style target covered by merge");
                warnings.push(LayoutWarning::CoveredCell {
                    col,
                    row: target_row,
                    range,
                });
                continue;
            }
        }
        sheet.get_cell_mut((col, target_row)).set_style(style);
    }

    sheet
        .get_cell_mut((INVOICE_MARKER_COL, target_row))
        .get_style_mut()
        .set_background_color(INVOICE_MARKER_ARGB);

    warnings
}

/// Which sides of a cell get a black border line.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Sides {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

impl Sides {
    pub const ALL: Sides = Sides {
        left: true,
        right: true,
        top: true,
        bottom: true,
    };
    pub const LEFT: Sides = Sides {
        left: true,
        right: false,
        top: false,
        bottom: false,
    };
    pub const LEFT_RIGHT_BOTTOM: Sides = Sides {
        left: true,
        right: true,
        top: false,
        bottom: true,
    };
}

/// Replace the borders of `style` with `weight` lines on `sides`.
///
/// Sides not listed are reset, matching how a fresh border object replaces the
/// old one in the template.
pub(crate) fn set_borders(style: &mut Style, sides: Sides, weight: &str) {
    let borders = style.get_borders_mut();
    let apply = |border: &mut Border, on: bool| {
        if on {
            border.set_border_style(weight);
            border.get_color_mut().set_argb("FF000000");
        } else {
            border.set_border_style(Border::BORDER_NONE);
        }
    };
    apply(borders.get_left_mut(), sides.left);
    apply(borders.get_right_mut(), sides.right);
    apply(borders.get_top_mut(), sides.top);
    apply(borders.get_bottom_mut(), sides.bottom);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::layout::{FIRST_COL, LAST_COL};

    fn styled_source(ws: &mut Worksheet) {
        for col in FIRST_COL..=LAST_COL {
            let cell = ws.get_cell_mut((col, 13));
            cell.set_value_string(format!("src{col}"));
            let style = cell.get_style_mut();
            style.get_font_mut().set_bold(true);
            set_borders(style, Sides::ALL, Border::BORDER_THIN);
        }
        ws.get_row_dimension_mut(&13).set_height(30.0);
    }

    #[test]
    fn test_copies_style_height_and_marker() {
        let mut book = umya_spreadsheet::new_file();
        let ws = book.get_active_sheet_mut();
        styled_source(ws);

        let warnings = copy_style(ws, 13, 14, FIRST_COL..=LAST_COL);
        assert!(warnings.is_empty());

        let target = ws.get_cell((2, 14)).unwrap().get_style();
        assert!(*target.get_font().unwrap().get_bold());
        assert_eq!(
            target.get_borders().unwrap().get_left().get_border_style(),
            Border::BORDER_THIN
        );
        assert_eq!(*ws.get_row_dimension(&14).unwrap().get_height(), 30.0);

        // values are not part of the style
        assert_eq!(ws.get_cell((2, 14)).unwrap().get_value(), "");

        let marker = ws.get_cell((INVOICE_MARKER_COL, 14)).unwrap().get_style();
        assert_eq!(
            marker.get_background_color().unwrap().get_argb(),
            INVOICE_MARKER_ARGB
        );
    }

    #[test]
    fn test_target_style_is_an_independent_copy() {
        let mut book = umya_spreadsheet::new_file();
        let ws = book.get_active_sheet_mut();
        styled_source(ws);
        copy_style(ws, 13, 14, FIRST_COL..=LAST_COL);

        ws.get_cell_mut((3, 14))
            .get_style_mut()
            .set_background_color("FF00FF00");
        ws.get_cell_mut((3, 14))
            .get_style_mut()
            .get_font_mut()
            .set_bold(false);

        let source = ws.get_cell((3, 13)).unwrap().get_style();
        assert!(source.get_background_color().is_none());
        assert!(*source.get_font().unwrap().get_bold());
        // the source row never receives the invoicing marker
        assert!(ws
            .get_cell((INVOICE_MARKER_COL, 13))
            .unwrap()
            .get_style()
            .get_background_color()
            .is_none());
    }

    #[test]
    fn test_covered_column_is_skipped_not_fatal() {
        let mut book = umya_spreadsheet::new_file();
        let ws = book.get_active_sheet_mut();
        styled_source(ws);
        ws.add_merge_cells("C14:D14");

        let warnings = copy_style(ws, 13, 14, FIRST_COL..=LAST_COL);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            warnings[0],
            LayoutWarning::CoveredCell { col: 4, row: 14, .. }
        ));
        // columns after the bad one were still copied
        let after = ws.get_cell((5, 14)).unwrap().get_style();
        assert!(*after.get_font().unwrap().get_bold());
    }

    #[test]
    fn test_row_zero_is_rejected() {
        let mut book = umya_spreadsheet::new_file();
        let ws = book.get_active_sheet_mut();
        let warnings = copy_style(ws, 0, 14, FIRST_COL..=LAST_COL);
        assert_eq!(warnings, vec![LayoutWarning::RowOutOfRange(0)]);
    }
}
