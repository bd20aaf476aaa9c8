// src/sheet/trailing.rs

use super::LayoutWarning;
use super::layout::{
    COL_B, COL_I, COL_J, COL_K, COL_L, FIRST_COL, LAST_COL, TRAILING_ROW_HEIGHT, TrailingRole,
};
use super::merge::{MergeRange, dissolve_merges_touching, merge_cells};
use super::style::{Sides, set_borders};
use tracing::{debug, info};
use umya_spreadsheet::{Border, HorizontalAlignmentValues, VerticalAlignmentValues, Worksheet};

const DISPATCH_CAPTION: &str = "Expedícia objednávky";
const PALLET_TYPE_CAPTION: &str = "Typ palety";
const DIMENSIONS_CAPTION: &str = "Rozmer";
const WEIGHT_CAPTION: &str = "Váha";
const CAPTION_FONT: &str = "Calibri";

/// Render the dispatch/footer block below the item table.
///
/// Everything is placed relative to `last_item_row` and every sub-row clears
/// its own merges before merging again, so the block can be rendered at a new
/// offset no matter what an earlier run left there. Clearing the old location
/// is up to the caller.
pub fn relocate_trailing_section(sheet: &mut Worksheet, last_item_row: u32) -> Vec<LayoutWarning> {
    let span = tracing::info_span!("trailing", last_item_row);
    let _guard = span.enter();

    let mut warnings = Vec::new();
    prepare_rows(sheet, last_item_row);
    warnings.extend(dispatch_header(sheet, last_item_row));
    warnings.extend(pallet_captions(sheet, last_item_row));
    warnings.extend(notes_box(sheet, last_item_row));
    signature_row(sheet, last_item_row);
    closing_rule(sheet, last_item_row);

    info!(
        top = TrailingRole::DispatchHeader.row(last_item_row),
        bottom = TrailingRole::ClosingRule.row(last_item_row),
        warnings = warnings.len(),
        "Trailing block rendered"
    );
    warnings
}

/// Blank out the rows the block occupies, spacer included.
fn prepare_rows(sheet: &mut Worksheet, last_item_row: u32) {
    let first = TrailingRole::Spacer.row(last_item_row);
    let last = TrailingRole::ClosingRule.row(last_item_row);
    for row in first..=last {
        dissolve_merges_touching(sheet, row);
        sheet
            .get_row_dimension_mut(&row)
            .set_height(TRAILING_ROW_HEIGHT);
        for col in FIRST_COL..=LAST_COL {
            let cell = sheet.get_cell_mut((col, row));
            cell.set_value_string("");
            if (COL_B..COL_L).contains(&col) {
                let alignment = cell.get_style_mut().get_alignment_mut();
                alignment.set_horizontal(HorizontalAlignmentValues::Left);
                alignment.set_vertical(VerticalAlignmentValues::Center);
            }
        }
    }
    debug!(first, last, "Prepared trailing rows");
}

fn dispatch_header(sheet: &mut Worksheet, last_item_row: u32) -> Option<LayoutWarning> {
    let row = TrailingRole::DispatchHeader.row(last_item_row);
    dissolve_merges_touching(sheet, row);
    let merged = merge_cells(sheet, MergeRange::row_span(row, COL_I, COL_L)).err();

    caption(sheet, COL_I, row, DISPATCH_CAPTION, 20.0, true);
    let alignment = sheet.get_cell_mut((COL_I, row)).get_style_mut().get_alignment_mut();
    alignment.set_horizontal(HorizontalAlignmentValues::Center);
    alignment.set_vertical(VerticalAlignmentValues::Center);

    for col in COL_I..=COL_L {
        let style = sheet.get_cell_mut((col, row)).get_style_mut();
        set_borders(style, Sides::ALL, Border::BORDER_MEDIUM);
    }
    merged
}

fn pallet_captions(sheet: &mut Worksheet, last_item_row: u32) -> Option<LayoutWarning> {
    let row = TrailingRole::PalletCaptions.row(last_item_row);
    dissolve_merges_touching(sheet, row);
    let merged = merge_cells(sheet, MergeRange::row_span(row, COL_J, COL_K)).err();

    caption(sheet, COL_I, row, PALLET_TYPE_CAPTION, 16.0, false);
    caption(sheet, COL_J, row, DIMENSIONS_CAPTION, 16.0, false);
    caption(sheet, COL_L, row, WEIGHT_CAPTION, 16.0, false);

    for col in COL_I..=COL_L {
        let style = sheet.get_cell_mut((col, row)).get_style_mut();
        set_borders(style, Sides::LEFT_RIGHT_BOTTOM, Border::BORDER_THIN);
    }
    merged
}

/// Free-form notes: one box over J:K spanning four rows, ruled on the left by I.
fn notes_box(sheet: &mut Worksheet, last_item_row: u32) -> Option<LayoutWarning> {
    let first = TrailingRole::NotesFirst.row(last_item_row);
    let last = TrailingRole::NotesLast.row(last_item_row);
    for row in first..=last {
        dissolve_merges_touching(sheet, row);
        let style = sheet.get_cell_mut((COL_I, row)).get_style_mut();
        set_borders(style, Sides::LEFT, Border::BORDER_THIN);
    }

    let merged = merge_cells(sheet, MergeRange::new(COL_J, first, COL_K, last)).err();
    for row in first..=last {
        for col in COL_J..=COL_K {
            let style = sheet.get_cell_mut((col, row)).get_style_mut();
            set_borders(style, Sides::ALL, Border::BORDER_THIN);
        }
    }
    merged
}

fn signature_row(sheet: &mut Worksheet, last_item_row: u32) {
    let row = TrailingRole::Signature.row(last_item_row);
    dissolve_merges_touching(sheet, row);
    for col in COL_I..=COL_L {
        let style = sheet.get_cell_mut((col, row)).get_style_mut();
        set_borders(style, Sides::LEFT, Border::BORDER_THIN);
    }
}

fn closing_rule(sheet: &mut Worksheet, last_item_row: u32) {
    let row = TrailingRole::ClosingRule.row(last_item_row);
    dissolve_merges_touching(sheet, row);
    for col in FIRST_COL..=LAST_COL {
        let style = sheet.get_cell_mut((col, row)).get_style_mut();
        set_borders(style, Sides::ALL, Border::BORDER_THIN);
    }
}

fn caption(sheet: &mut Worksheet, col: u32, row: u32, text: &str, size: f64, bold: bool) {
    let cell = sheet.get_cell_mut((col, row));
    cell.set_value_string(text);
    let style = cell.get_style_mut();
    let font = style.get_font_mut();
    font.set_name(CAPTION_FONT);
    font.set_size(size);
    font.set_bold(bold);
    let alignment = style.get_alignment_mut();
    alignment.set_horizontal(HorizontalAlignmentValues::Left);
    alignment.set_vertical(VerticalAlignmentValues::Center);
}
