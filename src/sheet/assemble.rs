// src/sheet/assemble.rs

use super::LayoutWarning;
use super::layout::{
    BULK_RETURN_CELL, CLIENT_CELL, COL_I, COL_L, FIRST_ITEM_ROW, FOIL_CELL, MICROBIOLOGY_CELL,
    ORDER_NUMBER_CELL, REQUIREMENTS_FIRST_ROW, REQUIREMENTS_LAST_ROW, REQUIREMENTS_ROW_HEIGHT,
    TrailingRole, last_item_row,
};
use super::merge::{
    MergeRange, dissolve_merges_overlapping, dissolve_merges_touching, merge_cells, merged_ranges,
};
use super::rows::{provision_item_rows, write_item};
use super::trailing::relocate_trailing_section;
use crate::order::OrderRecord;
use tracing::{info, warn};
use umya_spreadsheet::{HorizontalAlignmentValues, VerticalAlignmentValues, Worksheet};

/// What one assembly pass did to the sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyReport {
    pub items_written: usize,
    pub last_item_row: u32,
    /// First row of the dispatch header.
    pub trailing_top: u32,
    /// Last row of the sheet; nothing exists below it.
    pub trailing_bottom: u32,
    /// Stale rows deleted below the item table.
    pub rows_removed: u32,
    pub warnings: Vec<LayoutWarning>,
}

impl AssemblyReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// The fixed requirements box, `I4:L9`.
pub fn requirements_box() -> MergeRange {
    MergeRange::new(COL_I, REQUIREMENTS_FIRST_ROW, COL_L, REQUIREMENTS_LAST_ROW)
}

/// Project `order` onto a template sheet.
///
/// Best effort: a step that cannot be completed leaves a warning in the report
/// and the remaining steps still run, so the sheet is always usable.
pub fn assemble_order_sheet(sheet: &mut Worksheet, order: &OrderRecord) -> AssemblyReport {
    let mut report = AssemblyReport::default();

    write_header(sheet, order);
    report.warnings.extend(write_requirements(sheet, order));

    let last = last_item_row(order.items.len());
    report.last_item_row = last;
    info!(items = order.items.len(), last_item_row = last, "Last item row");

    report
        .warnings
        .extend(provision_item_rows(sheet, order.items.len()));

    for (idx, item) in order.items.iter().enumerate() {
        let row = FIRST_ITEM_ROW + idx as u32;
        report.warnings.extend(write_item(sheet, row, item));
        report.items_written += 1;
    }

    report.rows_removed = remove_rows_below(sheet, last);
    report
        .warnings
        .extend(relocate_trailing_section(sheet, last));
    report.trailing_top = TrailingRole::DispatchHeader.row(last);
    report.trailing_bottom = TrailingRole::ClosingRule.row(last);

    for warning in &report.warnings {
        warn!(%warning, "Layout step skipped");
    }
    report
}

fn write_header(sheet: &mut Worksheet, order: &OrderRecord) {
    let fields = [
        (CLIENT_CELL, &order.client),
        (ORDER_NUMBER_CELL, &order.order_number),
        (FOIL_CELL, &order.foil),
        (BULK_RETURN_CELL, &order.bulk_return),
        (MICROBIOLOGY_CELL, &order.microbiology),
    ];
    for (cell, value) in fields {
        sheet.get_cell_mut(cell).set_value_string(value.as_str());
    }
}

fn write_requirements(sheet: &mut Worksheet, order: &OrderRecord) -> Option<LayoutWarning> {
    let range = requirements_box();
    dissolve_merges_overlapping(sheet, range);
    let merged = merge_cells(sheet, range).err();

    let text = order.requirement_clauses().join("\n");
    let cell = sheet.get_cell_mut((range.first_col, range.first_row));
    cell.set_value_string(text);
    let alignment = cell.get_style_mut().get_alignment_mut();
    alignment.set_horizontal(HorizontalAlignmentValues::Left);
    alignment.set_vertical(VerticalAlignmentValues::Top);
    alignment.set_wrap_text(true);

    for row in range.first_row..=range.last_row {
        sheet
            .get_row_dimension_mut(&row)
            .set_height(REQUIREMENTS_ROW_HEIGHT);
    }
    merged
}

/// Current last row, counting merges that reach past the last written cell.
fn sheet_extent(sheet: &Worksheet) -> u32 {
    let (ranges, _) = merged_ranges(sheet);
    ranges
        .iter()
        .map(|r| r.last_row)
        .chain(std::iter::once(sheet.get_highest_row()))
        .max()
        .unwrap_or(0)
}

/// Delete everything below `last_item_row`, after clearing the merges there.
fn remove_rows_below(sheet: &mut Worksheet, last_item_row: u32) -> u32 {
    let extent = sheet_extent(sheet);
    if extent <= last_item_row {
        return 0;
    }
    info!(from = last_item_row + 1, to = extent, "Cleaning extra rows");
    for row in last_item_row + 1..=extent {
        dissolve_merges_touching(sheet, row);
    }
    let count = extent - last_item_row;
    sheet.remove_row(&(last_item_row + 1), &count);
    info!(count, "Deleted extra rows");
    count
}
