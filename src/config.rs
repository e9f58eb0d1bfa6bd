//! Serde model of the station configuration document and the explicit loading step
//! the host runs before building a [`crate::StationRegistry`].
//!
//! The document is a JSON object keyed by group name; group and station order are
//! preserved as written.

use crate::types::data_type::{DataType, DataTypeOverride};
use crate::types::location::LatLon;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read station configuration '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse station configuration")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to parse station group '{group}'")]
    GroupParse {
        group: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A set of stations sharing one endpoint, one station type and one list of data types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationGroup {
    /// The key this group was listed under.
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "DATA_TYPES")]
    pub data_types: Vec<DataType>,
    #[serde(rename = "STATIONS")]
    pub stations: Vec<StationEntry>,
    /// Tag naming the station variant; absent means a plain date-range series station.
    #[serde(rename = "STATION_TYPE", default)]
    pub station_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationEntry {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    pub coords: LatLon,
    #[serde(default)]
    pub inactive: bool,
    #[serde(rename = "DATA_TYPE_OVERRIDES", default)]
    pub data_type_overrides: Vec<DataTypeOverride>,
    #[serde(default)]
    pub map_icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationsConfig {
    pub groups: Vec<StationGroup>,
}

impl StationsConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let document: Map<String, Value> = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let document: Map<String, Value> = serde_json::from_slice(bytes)?;
        Self::from_document(document)
    }

    /// Reads and parses a configuration file.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let config = Self::from_slice(&bytes)?;
        info!(
            "Loaded {} station groups from {}",
            config.groups.len(),
            path.display()
        );
        Ok(config)
    }

    fn from_document(document: Map<String, Value>) -> Result<Self, ConfigError> {
        let groups = document
            .into_iter()
            .map(|(name, value)| {
                let mut group: StationGroup =
                    serde_json::from_value(value).map_err(|source| ConfigError::GroupParse {
                        group: name.clone(),
                        source,
                    })?;
                group.name = name;
                Ok(group)
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self { groups })
    }
}
