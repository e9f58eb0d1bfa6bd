use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field name the timestamp is exposed under when a point is serialized.
pub const TIMESTAMP_FIELD: &str = "Timestamp";

/// One normalized record: a timestamp plus one value per configured data type,
/// keyed by the data type's canonical name and already converted to its unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl DataPoint {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, data_type_name: &str) -> Option<f64> {
        self.values.get(data_type_name).copied()
    }
}
