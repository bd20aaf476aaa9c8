// src/sheet/rows.rs

use super::LayoutWarning;
use super::layout::{
    FIRST_COL, FIRST_ITEM_ROW, ITEM_BULK_COL, ITEM_EMBOSSING_COL, ITEM_FILLING_COL,
    ITEM_HEATING_COL, ITEM_LABEL_COL, ITEM_NAME_COL, ITEM_QTY_COL, ITEM_SACHET_COL,
    ITEM_SEPARATOR, ITEM_SEPARATOR_COL, LAST_COL, MODEL_ROW, TEMPLATE_ITEM_ROWS, item_label,
};
use super::merge::dissolve_merges_touching;
use super::style::copy_style;
use crate::order::ItemRecord;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};
use umya_spreadsheet::Worksheet;

static ITEM_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\d+\.\s*$").unwrap());

/// Size of the item block already present in the sheet.
///
/// Counts contiguous rows from the first item row whose label cell reads like
/// `"7."`. Never less than the two rows every template ships with.
pub fn count_item_rows(sheet: &Worksheet) -> u32 {
    let mut count = 0;
    while let Some(cell) = sheet.get_cell((ITEM_LABEL_COL, FIRST_ITEM_ROW + count)) {
        if !ITEM_LABEL.is_match(&cell.get_value()) {
            break;
        }
        count += 1;
    }
    count.max(TEMPLATE_ITEM_ROWS)
}

/// Grow the item block so it holds at least `item_count` rows.
///
/// New rows go directly below the existing block, one after another, each
/// styled after the model row and labelled with its position. Surplus rows are
/// left alone; trimming them is the assembler's job.
pub fn provision_item_rows(sheet: &mut Worksheet, item_count: usize) -> Vec<LayoutWarning> {
    let mut warnings = Vec::new();
    let existing = count_item_rows(sheet);
    let wanted = item_count as u32;
    if wanted <= existing {
        debug!(existing, wanted, "Item block already large enough");
        return warnings;
    }

    let first_new = FIRST_ITEM_ROW + existing;
    info!(existing, wanted, first_new, "Inserting item rows");
    for i in 0..wanted - existing {
        let row = first_new + i;
        sheet.insert_new_row(&row, &1);
        dissolve_merges_touching(sheet, row);
        warnings.extend(copy_style(sheet, MODEL_ROW, row, FIRST_COL..=LAST_COL));
        sheet
            .get_cell_mut((ITEM_LABEL_COL, row))
            .set_value_string(format!("{}.", existing + i + 1));
    }
    warnings
}

/// Write one item into its row.
///
/// Merges touching the row are dissolved first. Empty fields are written as
/// empty strings so every column of the row is defined.
pub fn write_item(sheet: &mut Worksheet, row: u32, item: &ItemRecord) -> Vec<LayoutWarning> {
    if row < FIRST_ITEM_ROW {
        return vec![LayoutWarning::RowOutOfRange(row)];
    }
    dissolve_merges_touching(sheet, row);

    let fields: [(u32, &str); 8] = [
        (ITEM_NAME_COL, item.name.as_str()),
        (ITEM_EMBOSSING_COL, item.embossing.as_str()),
        (ITEM_HEATING_COL, item.heating.as_str()),
        (ITEM_SACHET_COL, item.sachet_size.as_str()),
        (ITEM_FILLING_COL, item.filling_volume.as_str()),
        (ITEM_QTY_COL, item.quantity.as_str()),
        (ITEM_BULK_COL, item.bulk_quantity.as_str()),
        (ITEM_SEPARATOR_COL, ITEM_SEPARATOR),
    ];
    sheet
        .get_cell_mut((ITEM_LABEL_COL, row))
        .set_value_string(item_label(row));
    for (col, value) in fields {
        sheet.get_cell_mut((col, row)).set_value_string(value);
    }
    Vec::new()
}
