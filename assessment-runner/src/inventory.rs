//! Inventory files: one statement per row, `label_raw,text,label_ocean,key`.

use dialog_service::services::Trait;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

use crate::error::AssessmentError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Facet label, e.g. `Anxiety`.
    #[serde(default)]
    pub label_raw: String,
    /// Statement completing "You ...", e.g. `worry about things`.
    pub text: String,
    /// OCEAN code of the trait the item loads on.
    pub label_ocean: String,
    /// `1` for positively keyed items; anything else is scored in reverse.
    #[serde(default = "positive_key")]
    pub key: i32,
}

fn positive_key() -> i32 {
    1
}

impl InventoryItem {
    pub fn trait_code(&self) -> Option<Trait> {
        Trait::from_code(&self.label_ocean)
    }

    pub fn is_reverse_keyed(&self) -> bool {
        self.key != 1
    }
}

pub fn parse_inventory<R: Read>(reader: R) -> Result<Vec<InventoryItem>, AssessmentError> {
    let mut rows = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let items = rows
        .deserialize()
        .collect::<Result<Vec<InventoryItem>, _>>()?;

    let unknown: Vec<&str> = items
        .iter()
        .filter(|item| item.trait_code().is_none())
        .map(|item| item.label_ocean.as_str())
        .collect();
    if !unknown.is_empty() {
        tracing::warn!(labels = ?unknown, "Inventory items with unknown trait codes will not be scored");
    }

    Ok(items)
}

pub fn load_inventory(path: impl AsRef<Path>) -> Result<Vec<InventoryItem>, AssessmentError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| AssessmentError::io(path, e))?;
    let items = parse_inventory(file)?;
    tracing::info!(count = items.len(), path = %path.display(), "Loaded inventory items");
    Ok(items)
}
