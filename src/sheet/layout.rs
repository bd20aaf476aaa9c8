// src/sheet/layout.rs
//
// Fixed geometry of the order-note template. Rows and columns are 1-based,
// as in the worksheet itself.

pub const COL_A: u32 = 1;
pub const COL_B: u32 = 2;
pub const COL_C: u32 = 3;
pub const COL_E: u32 = 5;
pub const COL_F: u32 = 6;
pub const COL_G: u32 = 7;
pub const COL_H: u32 = 8;
pub const COL_I: u32 = 9;
pub const COL_J: u32 = 10;
pub const COL_K: u32 = 11;
pub const COL_L: u32 = 12;

/// Columns A..L make up the whole printed width.
pub const FIRST_COL: u32 = COL_A;
pub const LAST_COL: u32 = COL_L;

/// Header field cells, written top to bottom.
pub const CLIENT_CELL: (u32, u32) = (COL_C, 3);
pub const ORDER_NUMBER_CELL: (u32, u32) = (COL_C, 4);
pub const FOIL_CELL: (u32, u32) = (COL_C, 5);
pub const BULK_RETURN_CELL: (u32, u32) = (COL_C, 6);
pub const MICROBIOLOGY_CELL: (u32, u32) = (COL_C, 7);

/// Requirements text box `I4:L9`.
pub const REQUIREMENTS_FIRST_ROW: u32 = 4;
pub const REQUIREMENTS_LAST_ROW: u32 = 9;
pub const REQUIREMENTS_ROW_HEIGHT: f64 = 20.0;

/// Labels row of the item table; item `n` lives in row `ITEM_HEADER_ROW + n`.
pub const ITEM_HEADER_ROW: u32 = 11;
pub const FIRST_ITEM_ROW: u32 = ITEM_HEADER_ROW + 1;
/// The blank template ships with this many pre-styled item rows.
pub const TEMPLATE_ITEM_ROWS: u32 = 2;
/// Second template item row: style source for every inserted item row.
pub const MODEL_ROW: u32 = FIRST_ITEM_ROW + 1;

/// Item field columns.
pub const ITEM_LABEL_COL: u32 = COL_A;
pub const ITEM_NAME_COL: u32 = COL_B;
pub const ITEM_EMBOSSING_COL: u32 = COL_C;
pub const ITEM_HEATING_COL: u32 = COL_E;
pub const ITEM_SACHET_COL: u32 = COL_F;
pub const ITEM_FILLING_COL: u32 = COL_G;
pub const ITEM_QTY_COL: u32 = COL_H;
pub const ITEM_BULK_COL: u32 = COL_I;
pub const ITEM_SEPARATOR_COL: u32 = COL_J;
pub const ITEM_SEPARATOR: &str = "/";

/// "Fakturovať" column, always flagged with a solid red fill.
pub const INVOICE_MARKER_COL: u32 = COL_L;
pub const INVOICE_MARKER_ARGB: &str = "FFFF0000";

pub const TRAILING_ROW_HEIGHT: f64 = 25.0;

/// Last row of the item block for `item_count` items.
///
/// With no items the block still ends on the first template row.
pub fn last_item_row(item_count: usize) -> u32 {
    if item_count == 0 {
        FIRST_ITEM_ROW
    } else {
        ITEM_HEADER_ROW + item_count as u32
    }
}

/// Row-number label for an item row, e.g. `"3."` for row 14.
pub fn item_label(row: u32) -> String {
    format!("{}.", row - ITEM_HEADER_ROW)
}

/// Logical sub-rows of the block that follows the item table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingRole {
    Spacer,
    DispatchHeader,
    PalletCaptions,
    NotesFirst,
    NotesLast,
    Signature,
    ClosingRule,
}

impl TrailingRole {
    /// Distance from the last item row.
    pub const fn offset(self) -> u32 {
        match self {
            TrailingRole::Spacer => 1,
            TrailingRole::DispatchHeader => 2,
            TrailingRole::PalletCaptions => 3,
            TrailingRole::NotesFirst => 4,
            TrailingRole::NotesLast => 7,
            TrailingRole::Signature => 8,
            TrailingRole::ClosingRule => 9,
        }
    }

    pub const fn row(self, last_item_row: u32) -> u32 {
        last_item_row + self.offset()
    }
}

/// Number of rows the trailing block occupies, spacer included.
pub const TRAILING_ROWS: u32 = TrailingRole::ClosingRule.offset();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_item_row_floor() {
        assert_eq!(last_item_row(0), 12);
        assert_eq!(last_item_row(1), 12);
        assert_eq!(last_item_row(2), 13);
        assert_eq!(last_item_row(10), 21);
    }

    #[test]
    fn test_trailing_offsets() {
        assert_eq!(TrailingRole::DispatchHeader.row(12), 14);
        assert_eq!(TrailingRole::DispatchHeader.row(last_item_row(5)), 18);
        assert_eq!(TrailingRole::NotesLast.offset() - TrailingRole::NotesFirst.offset(), 3);
        assert_eq!(TRAILING_ROWS, 9);
    }

    #[test]
    fn test_item_label() {
        assert_eq!(item_label(FIRST_ITEM_ROW), "1.");
        assert_eq!(item_label(MODEL_ROW + 2), "4.");
    }
}
