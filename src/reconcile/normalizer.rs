//! Materializes every recognized actuals key.

use crate::core::{ActualsSchema, CellValue, RawActuals};
use serde::{Deserialize, Serialize};

static NULL_CELL: CellValue = CellValue::Null;

/// Actuals of one row with exactly the schema's key set.
///
/// Built by [`normalize`]; [`ActualsRecord::with_value`] never adds keys.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActualsRecord {
    values: RawActuals,
}

impl ActualsRecord {
    pub fn get(&self, field: &str) -> &CellValue {
        self.values.get(field).unwrap_or(&NULL_CELL)
    }

    pub fn values(&self) -> &RawActuals {
        &self.values
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a copy with one key replaced. Keys outside the record are ignored.
    pub fn with_value(&self, field: &str, value: CellValue) -> Self {
        let mut values = self.values.clone();
        if let Some(slot) = values.get_mut(field) {
            *slot = value;
        }
        Self { values }
    }
}

/// Builds the full actuals record for a row.
///
/// Keys the schema does not know are dropped; keys the caller left out are
/// filled with `CellValue::Null`.
pub fn normalize(schema: &ActualsSchema, raw: Option<&RawActuals>) -> ActualsRecord {
    let values = schema
        .fields()
        .iter()
        .map(|field| {
            let value = raw
                .and_then(|raw| raw.get(field.name))
                .cloned()
                .unwrap_or_default();
            (field.name.to_string(), value)
        })
        .collect();
    ActualsRecord { values }
}
