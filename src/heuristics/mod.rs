// src/heuristics/mod.rs

mod generic;

use crate::order::OrderRecord;

/// Extract an order record from raw PDF text without a model.
///
/// Values stay in the document's language; nothing is translated.
pub fn extract_order(text: &str) -> OrderRecord {
    generic::extract(text)
}
