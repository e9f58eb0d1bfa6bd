//! Live "current conditions" feed for one data type across every station carrying it.
//!
//! A host selects a data type and date range; the board marks each matching station
//! [`Status::Loading`], resolves their most recent readings in the background and
//! publishes every change as a [`BoardSnapshot`] on a watch channel. Selecting again
//! cancels the previous selection, so late results never overwrite newer state.

use crate::registry::StationRegistry;
use crate::types::data_point::DataPoint;
use crate::types::location::LatLon;
use crate::types::period::DateRange;
use log::{debug, warn};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Loading / unavailable / ready, as shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Status<T> {
    Loading,
    Unavailable,
    Ready(T),
}

impl<T> Status<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Status::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Status::Ready(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationMarker {
    pub station: String,
    pub coords: LatLon,
    pub status: Status<DataPoint>,
}

impl StationMarker {
    /// The selected data type's value once the marker is ready.
    pub fn value(&self, data_type_name: &str) -> Option<f64> {
        self.status.ready().and_then(|point| point.get(data_type_name))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    pub data_type: String,
    pub range: Option<DateRange>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardSnapshot {
    pub selection: Selection,
    pub markers: Vec<StationMarker>,
    /// Station whose full series is shown, with that series.
    pub active_station: Option<String>,
    pub active_series: Status<Arc<[DataPoint]>>,
}

impl Default for BoardSnapshot {
    fn default() -> Self {
        Self {
            selection: Selection::default(),
            markers: Vec::new(),
            active_station: None,
            active_series: Status::Unavailable,
        }
    }
}

impl BoardSnapshot {
    pub fn marker(&self, station: &str) -> Option<&StationMarker> {
        self.markers.iter().find(|marker| marker.station == station)
    }

    /// `true` once no marker is loading.
    pub fn is_settled(&self) -> bool {
        !self.markers.iter().any(|marker| marker.status.is_loading())
    }

    /// Minimum and maximum of the ready markers' values, for a color scale.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.markers
            .iter()
            .filter_map(|marker| marker.value(&self.selection.data_type))
            .fold(None, |range, value| match range {
                None => Some((value, value)),
                Some((min, max)) => Some((min.min(value), max.max(value))),
            })
    }
}

/// Owns the published [`BoardSnapshot`] and the tokens of the in-flight selection.
pub struct ConditionsBoard {
    registry: Arc<StationRegistry>,
    sender: Arc<watch::Sender<BoardSnapshot>>,
    markers_token: Mutex<CancellationToken>,
    series_token: Mutex<CancellationToken>,
}

/// Cancels the token in `slot` and installs a fresh one.
fn renew(slot: &Mutex<CancellationToken>) -> CancellationToken {
    let mut token = slot.lock().unwrap_or_else(PoisonError::into_inner);
    token.cancel();
    *token = CancellationToken::new();
    token.clone()
}

impl ConditionsBoard {
    pub fn new(registry: Arc<StationRegistry>) -> Self {
        let (sender, _) = watch::channel(BoardSnapshot::default());
        Self {
            registry,
            sender: Arc::new(sender),
            markers_token: Mutex::new(CancellationToken::new()),
            series_token: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<BoardSnapshot> {
        self.sender.subscribe()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.sender.borrow().clone()
    }

    /// Shows every station carrying `data_type_name`, each loading its most recent
    /// reading over `range`. Must be called within a tokio runtime.
    pub fn select(&self, data_type_name: &str, range: DateRange) {
        let token = renew(&self.markers_token);
        renew(&self.series_token);

        let stations = self.registry.stations_with_data_type(data_type_name);
        debug!(
            "Selecting '{}' over {} on {} stations",
            data_type_name,
            range,
            stations.len()
        );
        self.sender.send_replace(BoardSnapshot {
            selection: Selection {
                data_type: data_type_name.to_string(),
                range: Some(range),
            },
            markers: stations
                .iter()
                .map(|station| StationMarker {
                    station: station.name().to_string(),
                    coords: station.coords(),
                    status: Status::Loading,
                })
                .collect(),
            active_station: None,
            active_series: Status::Unavailable,
        });

        for station in stations {
            let sender = Arc::clone(&self.sender);
            let token = token.clone();
            tokio::spawn(async move {
                // Left to finish after cancellation; the station cache keeps the result.
                let result = station
                    .get_most_recent_data_point(range.start, range.end)
                    .await;
                let status = match result {
                    Ok(point) => Status::Ready(point),
                    Err(e) => {
                        warn!("No current reading for '{}': {}", station.name(), e);
                        Status::Unavailable
                    }
                };
                sender.send_if_modified(|snapshot| {
                    if token.is_cancelled() {
                        return false;
                    }
                    match snapshot
                        .markers
                        .iter_mut()
                        .find(|marker| marker.station == station.name())
                    {
                        Some(marker) => {
                            marker.status = status;
                            true
                        }
                        None => false,
                    }
                });
            });
        }
    }

    /// Loads the full series of `station_name` over the current selection's range.
    /// Returns `false` if no selection is active or the station is not on the board.
    pub fn select_station(&self, station_name: &str) -> bool {
        let range = self.sender.borrow().selection.range;
        let station = self
            .registry
            .station(station_name)
            .filter(|_| self.sender.borrow().marker(station_name).is_some())
            .cloned();
        let (Some(range), Some(station)) = (range, station) else {
            return false;
        };

        let token = renew(&self.series_token);
        self.sender.send_modify(|snapshot| {
            snapshot.active_station = Some(station_name.to_string());
            snapshot.active_series = Status::Loading;
        });

        let sender = Arc::clone(&self.sender);
        tokio::spawn(async move {
            let result = station
                .get_normalized_series(range.start, range.end)
                .await;
            let status = match result {
                Ok(series) => Status::Ready(series),
                Err(e) => {
                    warn!("No series for '{}': {}", station.name(), e);
                    Status::Unavailable
                }
            };
            sender.send_if_modified(|snapshot| {
                if token.is_cancelled() {
                    return false;
                }
                snapshot.active_series = status;
                true
            });
        });
        true
    }
}
