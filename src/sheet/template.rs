// src/sheet/template.rs
//
// Blank order-note template. Real deployments usually ship their own xlsx;
// this one satisfies the same contract and is what `template` writes out.

use super::layout::{
    BULK_RETURN_CELL, CLIENT_CELL, COL_B, COL_I, FIRST_COL, FIRST_ITEM_ROW, FOIL_CELL,
    INVOICE_MARKER_ARGB, INVOICE_MARKER_COL, ITEM_HEADER_ROW, ITEM_LABEL_COL, LAST_COL,
    MICROBIOLOGY_CELL, ORDER_NUMBER_CELL, TEMPLATE_ITEM_ROWS,
};
use super::style::{Sides, set_borders};
use std::path::Path;
use umya_spreadsheet::{Border, Spreadsheet, Worksheet};

const TITLE: &str = "Objednávkový list";
const ITEM_ROW_HEIGHT: f64 = 30.0;

const HEADER_LABELS: [((u32, u32), &str); 6] = [
    (CLIENT_CELL, "Zákazník:"),
    (ORDER_NUMBER_CELL, "Číslo objednávky:"),
    (FOIL_CELL, "Fólia:"),
    (BULK_RETURN_CELL, "Vrátenie bulk obalov:"),
    (MICROBIOLOGY_CELL, "Mikrobiologický rozbor:"),
    ((COL_I, 3), "Špecifické požiadavky:"),
];

const ITEM_COLUMNS: [&str; 12] = [
    "P.č.",
    "Názov položky",
    "Embossing",
    "",
    "Ohrev produktu",
    "Rozmer sáčku",
    "Plniaci objem",
    "Počet ks",
    "Bulk množstvo",
    "Archív",
    "Poznámka",
    "Fakturovať:",
];

/// Build the blank template in memory.
pub fn blank_template() -> Spreadsheet {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book.get_active_sheet_mut();
    sheet.set_name("Objednávka");

    let title = sheet.get_cell_mut((FIRST_COL, 1));
    title.set_value_string(TITLE);
    let font = title.get_style_mut().get_font_mut();
    font.set_bold(true);
    font.set_size(16.0);

    for ((col, row), text) in HEADER_LABELS {
        // labels sit one column left of their value cell
        let label_col = if col == COL_I { col } else { COL_B };
        sheet.get_cell_mut((label_col, row)).set_value_string(text);
    }
    sheet.add_merge_cells("I4:L9");

    for (idx, text) in ITEM_COLUMNS.iter().enumerate() {
        let cell = sheet.get_cell_mut((idx as u32 + 1, ITEM_HEADER_ROW));
        cell.set_value_string(*text);
        let style = cell.get_style_mut();
        style.get_font_mut().set_bold(true);
        set_borders(style, Sides::ALL, Border::BORDER_THIN);
    }

    for n in 1..=TEMPLATE_ITEM_ROWS {
        item_row(sheet, FIRST_ITEM_ROW + n - 1, n);
    }
    book
}

fn item_row(sheet: &mut Worksheet, row: u32, n: u32) {
    sheet.get_row_dimension_mut(&row).set_height(ITEM_ROW_HEIGHT);
    for col in FIRST_COL..=LAST_COL {
        let style = sheet.get_cell_mut((col, row)).get_style_mut();
        set_borders(style, Sides::ALL, Border::BORDER_THIN);
    }
    sheet
        .get_cell_mut((INVOICE_MARKER_COL, row))
        .get_style_mut()
        .set_background_color(INVOICE_MARKER_ARGB);
    sheet
        .get_cell_mut((ITEM_LABEL_COL, row))
        .set_value_string(format!("{n}."));
}

/// Write the blank template to `path`.
pub fn write_template(path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
    let book = blank_template();
    umya_spreadsheet::writer::xlsx::write(&book, path.as_ref())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::layout::MODEL_ROW;
    use crate::sheet::{count_item_rows, merged_ranges};

    #[test]
    fn test_template_contract() {
        let book = blank_template();
        let sheet = book.get_sheet(&0).unwrap();
        assert_eq!(count_item_rows(sheet), TEMPLATE_ITEM_ROWS);
        let (ranges, invalid) = merged_ranges(sheet);
        assert!(invalid.is_empty());
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].to_string(), "I4:L9");
        assert_eq!(*sheet.get_row_dimension(&MODEL_ROW).unwrap().get_height(), ITEM_ROW_HEIGHT);
        assert_eq!(sheet.get_highest_row(), MODEL_ROW);
    }

    #[test]
    fn test_written_template_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.xlsx");
        write_template(&path).unwrap();

        let book = umya_spreadsheet::reader::xlsx::read(&path).unwrap();
        let sheet = book.get_sheet(&0).unwrap();
        assert_eq!(count_item_rows(sheet), TEMPLATE_ITEM_ROWS);
        assert_eq!(merged_ranges(sheet).0.len(), 1);
    }
}
