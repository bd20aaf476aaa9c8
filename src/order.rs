// src/order.rs

use serde::{Deserialize, Deserializer, Serialize};

/// One ordered product line of a purchase order.
///
/// Every field is optional in the extracted JSON; `null` and missing keys both
/// land here as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(rename = "Item Name", default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(rename = "Sachet Size", default, deserialize_with = "null_as_empty")]
    pub sachet_size: String,
    #[serde(rename = "Filling Volume", default, deserialize_with = "null_as_empty")]
    pub filling_volume: String,
    #[serde(rename = "Products Heating", default, deserialize_with = "null_as_empty")]
    pub heating: String,
    #[serde(rename = "Embossing Data", default, deserialize_with = "null_as_empty")]
    pub embossing: String,
    #[serde(
        rename = "Required Bulk Quantity",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub bulk_quantity: String,
    #[serde(rename = "Qty", default, deserialize_with = "null_as_empty")]
    pub quantity: String,
}

/// All structured data we extract from a purchase-order PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(rename = "Client Name", default, deserialize_with = "null_as_empty")]
    pub client: String,
    #[serde(rename = "Order Number", default, deserialize_with = "null_as_empty")]
    pub order_number: String,
    #[serde(rename = "Foil", default, deserialize_with = "null_as_empty")]
    pub foil: String,
    #[serde(
        rename = "Return of Bulk Containers",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub bulk_return: String,
    #[serde(
        rename = "Microbiological Analysis",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub microbiology: String,
    /// Newline-joined list of requirement clauses.
    #[serde(
        rename = "Specific order requirements",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub requirements: String,
    #[serde(rename = "Items", default, deserialize_with = "null_as_default")]
    pub items: Vec<ItemRecord>,
}

impl OrderRecord {
    /// How many scalar fields carry a value (out of the six header fields).
    pub fn coverage(&self) -> (usize, usize) {
        let total = 6;
        let filled = [
            &self.client,
            &self.order_number,
            &self.foil,
            &self.bulk_return,
            &self.microbiology,
            &self.requirements,
        ]
        .iter()
        .filter(|v| !v.is_empty())
        .count();
        (filled, total)
    }

    /// Requirement clauses as stored in the requirements box.
    ///
    /// An empty requirements string still yields one (empty) clause so the box
    /// keeps its shape.
    pub fn requirement_clauses(&self) -> Vec<&str> {
        if self.requirements.is_empty() {
            vec![""]
        } else {
            self.requirements.split('\n').collect()
        }
    }
}

/// Models sometimes answer with numbers where we expect text ("Qty": 25000),
/// so any scalar is accepted and rendered as a string.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
