//! Declarations of how a station's raw fields map onto canonical, unit-normalized
//! quantities.

use serde::{Deserialize, Serialize};

/// A named physical quantity and the raw field it is read from.
///
/// `source_key` / `source_units` describe the station's raw payload, `name` /
/// `name_units` describe what the normalized series exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataType {
    /// Canonical name, e.g. `"Water Temperature"`.
    pub name: String,
    /// Field name in the raw station record.
    #[serde(rename = "key", alias = "sourceKey")]
    pub source_key: String,
    /// Unit of the normalized value.
    #[serde(alias = "nameUnits")]
    pub name_units: String,
    /// Unit the station reports in.
    #[serde(rename = "key_units", alias = "sourceUnits")]
    pub source_units: String,
}

impl DataType {
    pub fn new(
        name: impl Into<String>,
        source_key: impl Into<String>,
        name_units: impl Into<String>,
        source_units: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_key: source_key.into(),
            name_units: name_units.into(),
            source_units: source_units.into(),
        }
    }
}

/// A per-station replacement for one of its group's data types, matched by `name`.
///
/// Only the fields present replace the group default, so an override carrying every
/// field replaces the entry outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTypeOverride {
    pub name: String,
    #[serde(default, rename = "key", alias = "sourceKey")]
    pub source_key: Option<String>,
    #[serde(default, alias = "nameUnits")]
    pub name_units: Option<String>,
    #[serde(default, rename = "key_units", alias = "sourceUnits")]
    pub source_units: Option<String>,
}

impl DataTypeOverride {
    pub(crate) fn apply_to(&self, data_type: &mut DataType) {
        if let Some(source_key) = &self.source_key {
            data_type.source_key.clone_from(source_key);
        }
        if let Some(name_units) = &self.name_units {
            data_type.name_units.clone_from(name_units);
        }
        if let Some(source_units) = &self.source_units {
            data_type.source_units.clone_from(source_units);
        }
    }
}
