use crate::order::{ItemRecord, OrderRecord};
use regex::Regex;

/// Keyword-anchored regex extraction.
pub fn extract(text: &str) -> OrderRecord {
    OrderRecord {
        client: extract_client(text).unwrap_or_default(),
        order_number: extract_order_number(text).unwrap_or_default(),
        foil: extract_labelled(text, r"Foil").unwrap_or_default(),
        bulk_return: extract_labelled(text, r"Return\s+of\s+bulk\s+containers").unwrap_or_default(),
        microbiology: extract_labelled(text, r"Microbiological\s+analysis").unwrap_or_default(),
        requirements: extract_requirements(text).join("\n"),
        items: extract_items(text),
    }
}

// ---------------------------------------------------------------------------
// Scalar field extractors
// ---------------------------------------------------------------------------

fn extract_order_number(text: &str) -> Option<String> {
    // "Order number: PO-117", "Order No. 2025/044", "Purchase order #4711"
    let re = Regex::new(r"(?i)order\s*(?:number|no\.?|#)\s*:?\s*([A-Za-z0-9\-/]+)").ok()?;
    re.captures(text).map(|c| c[1].trim().to_string())
}

fn extract_client(text: &str) -> Option<String> {
    // Label on its own line, name on the next non-empty line
    let re = Regex::new(r"(?im)^\s*(?:Customer|Client|Buyer)\s*:?\s*$\n(?:\s*\n)*\s*(.+)").ok()?;
    if let Some(c) = re.captures(text) {
        return Some(c[1].trim().to_string());
    }
    // ...or on the same line
    let inline = Regex::new(r"(?im)^\s*(?:Customer|Client|Buyer)\s*:\s*(.+)$").ok()?;
    inline.captures(text).map(|c| c[1].trim().to_string())
}

/// Value after `label:` on the same line, with an optional leading dash.
fn extract_labelled(text: &str, label: &str) -> Option<String> {
    let re = Regex::new(&format!(r"(?im)^\s*[-–]?\s*{label}\s*:\s*(.+)$")).ok()?;
    re.captures(text).map(|c| c[1].trim().to_string())
}

// ---------------------------------------------------------------------------
// Order specifications
// ---------------------------------------------------------------------------

/// Dash-led lines of the ORDER SPECIFICATIONS section, minus the ones that
/// already have their own header cell.
fn extract_requirements(text: &str) -> Vec<String> {
    let heading = Regex::new(r"(?i)ORDER\s+SPECIFICATIONS").unwrap();
    let Some(start) = heading.find(text) else {
        return Vec::new();
    };
    let section = &text[start.start()..];
    let skip = Regex::new(r"(?i)^(microbiological\s+analysis|return\s+of\s+bulk\s+containers)\s*:")
        .unwrap();

    let mut clauses = Vec::new();
    // first line is the heading itself
    for line in section.lines().skip(1) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if clauses.is_empty() {
                continue;
            }
            break;
        }
        let Some(rest) = trimmed.strip_prefix(['-', '–']) else {
            continue;
        };
        let clause = rest.trim();
        if clause.is_empty() || skip.is_match(clause) {
            continue;
        }
        clauses.push(clause.to_string());
    }
    clauses
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// One item per `Sachet size / filling volume:` line.
fn extract_items(text: &str) -> Vec<ItemRecord> {
    let re = Regex::new(
        r"(?i)Sachet\s+size\s*/\s*filling\s+volume\s*:\s*(\d+\s*[x×]\s*\d+)\s*(?:mm)?\*?\s*/\s*([^\n]+)",
    )
    .unwrap();

    re.captures_iter(text)
        .map(|cap| ItemRecord {
            sachet_size: cap[1]
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| if c == '×' { 'x' } else { c })
                .collect(),
            filling_volume: decimal_dot(cap[2].trim()),
            ..Default::default()
        })
        .collect()
}

/// `"3,5ml (+/-0,2ml)"` → `"3.5ml (+/-0.2ml)"`.
fn decimal_dot(s: &str) -> String {
    let re = Regex::new(r"(\d),(\d)").unwrap();
    re.replace_all(s, "$1.$2").into_owned()
}
