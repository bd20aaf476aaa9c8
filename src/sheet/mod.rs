// src/sheet/mod.rs

mod assemble;
pub mod layout;
mod merge;
mod rows;
mod style;
pub mod template;
mod trailing;

pub use assemble::{AssemblyReport, assemble_order_sheet};
pub use merge::{MergeRange, merged_ranges};
pub use rows::count_item_rows;

use thiserror::Error;

/// A layout step that could not be carried out.
///
/// None of these abort a sheet; they are collected and reported so the caller
/// decides whether the output is good enough.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutWarning {
    #[error("merge range `{0}` is not a valid A1 range")]
    InvalidRange(String),

    #[error("cannot merge {requested}: overlaps existing merge {existing}")]
    MergeConflict {
        requested: MergeRange,
        existing: MergeRange,
    },

    #[error("cell ({col}, {row}) is covered by merge {range}")]
    CoveredCell { col: u32, row: u32, range: MergeRange },

    #[error("row {0} is outside the worksheet")]
    RowOutOfRange(u32),
}
