//! The immutable set of stations the host builds once at startup.

use crate::config::{StationEntry, StationGroup, StationsConfig};
use crate::stations::annual_station::AnnualStation;
use crate::stations::series_station::SeriesStation;
use crate::stations::source::{StationCore, StationKind, StationSource};
use crate::transport::JsonTransport;
use crate::types::data_type::DataType;
use crate::types::location::LatLon;
use bon::bon;
use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Station '{station}' overrides data type '{data_type}', which its group does not define")]
    UnknownOverrideTarget { station: String, data_type: String },

    #[error("Station group '{group}' has unknown station type '{tag}'")]
    UnknownStationType { group: String, tag: String },
}

/// Stations built from a [`StationsConfig`], in configuration order.
#[derive(Debug, Clone)]
pub struct StationRegistry {
    stations: Vec<Arc<dyn StationSource>>,
}

// Heap entry for the nearest-station query; only the distance takes part in ordering.
struct StationCandidate<'a> {
    distance_km: OrderedFloat<f64>,
    station: &'a Arc<dyn StationSource>,
}
impl PartialEq for StationCandidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.distance_km == other.distance_km
    }
}
impl Eq for StationCandidate<'_> {}
impl PartialOrd for StationCandidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for StationCandidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_km.cmp(&other.distance_km)
    }
}

#[bon]
impl StationRegistry {
    /// Builds every active station of `config`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownOverrideTarget`] if a station overrides a data type its
    /// group doesn't declare, [`RegistryError::UnknownStationType`] for an unrecognized
    /// `STATION_TYPE` tag.
    #[builder]
    pub fn new(
        config: &StationsConfig,
        transport: Arc<dyn JsonTransport>,
        cache_ttl: Option<Duration>,
        negative_ttl: Option<Duration>,
    ) -> Result<Self, RegistryError> {
        let mut stations: Vec<Arc<dyn StationSource>> = Vec::new();
        for group in &config.groups {
            let kind = StationKind::from_tag(group.station_type.as_deref()).ok_or_else(|| {
                RegistryError::UnknownStationType {
                    group: group.name.clone(),
                    tag: group.station_type.clone().unwrap_or_default(),
                }
            })?;

            for entry in group.stations.iter().filter(|entry| !entry.inactive) {
                let core = StationCore::builder()
                    .name(entry.name.as_str())
                    .url(group.url.as_str())
                    .coords(entry.coords)
                    .data_types(resolve_data_types(group, entry)?)
                    .transport(Arc::clone(&transport))
                    .maybe_map_icon(entry.map_icon.clone())
                    .maybe_cache_ttl(cache_ttl)
                    .maybe_negative_ttl(negative_ttl)
                    .build();
                debug!("Built {} station '{}'", kind, entry.name);
                let station: Arc<dyn StationSource> = match kind {
                    StationKind::Series => {
                        if entry.id.is_none() {
                            warn!(
                                "Series station '{}' has no id, requesting with an empty one",
                                entry.name
                            );
                        }
                        Arc::new(SeriesStation::new(
                            core,
                            entry.id.clone().unwrap_or_default(),
                        ))
                    }
                    StationKind::Annual => Arc::new(AnnualStation::new(core)),
                };
                stations.push(station);
            }
        }
        info!(
            "Station registry holds {} stations from {} groups",
            stations.len(),
            config.groups.len()
        );
        Ok(Self { stations })
    }
}

/// Copies the group's data types and applies the station's overrides by name.
fn resolve_data_types(
    group: &StationGroup,
    entry: &StationEntry,
) -> Result<Vec<DataType>, RegistryError> {
    let mut data_types = group.data_types.clone();
    for data_type_override in &entry.data_type_overrides {
        let target = data_types
            .iter_mut()
            .find(|data_type| data_type.name == data_type_override.name)
            .ok_or_else(|| RegistryError::UnknownOverrideTarget {
                station: entry.name.clone(),
                data_type: data_type_override.name.clone(),
            })?;
        data_type_override.apply_to(target);
    }
    Ok(data_types)
}

impl StationRegistry {
    pub fn stations(&self) -> &[Arc<dyn StationSource>] {
        &self.stations
    }

    pub fn station(&self, name: &str) -> Option<&Arc<dyn StationSource>> {
        self.stations.iter().find(|station| station.name() == name)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Stations declaring a data type called `data_type_name`.
    pub fn stations_with_data_type(&self, data_type_name: &str) -> Vec<Arc<dyn StationSource>> {
        self.stations
            .iter()
            .filter(|station| station.has_data_type(data_type_name))
            .cloned()
            .collect()
    }

    /// Stations declaring every one of `data_type_names`.
    pub fn stations_with_all_data_types(
        &self,
        data_type_names: &[&str],
    ) -> Vec<Arc<dyn StationSource>> {
        self.stations
            .iter()
            .filter(|station| {
                data_type_names
                    .iter()
                    .all(|name| station.has_data_type(name))
            })
            .cloned()
            .collect()
    }

    /// Up to `limit` stations closest to `location`, nearest first, with their distance in km.
    pub fn nearest_stations(
        &self,
        location: LatLon,
        limit: usize,
    ) -> Vec<(Arc<dyn StationSource>, f64)> {
        if limit == 0 {
            return vec![];
        }

        // Max-heap of the best `limit` so far: the farthest kept candidate sits on top.
        let mut heap: BinaryHeap<StationCandidate<'_>> = BinaryHeap::with_capacity(limit + 1);
        for station in &self.stations {
            heap.push(StationCandidate {
                distance_km: OrderedFloat(location.distance_km(&station.coords())),
                station,
            });
            if heap.len() > limit {
                heap.pop();
            }
        }

        heap.into_sorted_vec()
            .into_iter()
            .map(|candidate| (Arc::clone(candidate.station), candidate.distance_km.0))
            .collect()
    }
}
