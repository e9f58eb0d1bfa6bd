//! The station abstraction shared by every station variant.

use crate::cache::coalescer::RequestCoalescer;
use crate::stations::error::StationError;
use crate::stations::normalize::{normalize_records, MIN_SERIES_POINTS};
use crate::transport::JsonTransport;
use crate::types::data_point::DataPoint;
use crate::types::data_type::DataType;
use crate::types::location::LatLon;
use crate::types::period::DateRange;
use async_trait::async_trait;
use bon::bon;
use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How long downloaded and normalized data stays valid before it is fetched again.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// How long an insufficient-data result suppresses refetching the same range.
pub const DEFAULT_NEGATIVE_TTL: Duration = Duration::from_secs(5 * 60);

/// The station variants a registry can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationKind {
    /// One request per date range, records carry their own timestamps.
    Series,
    /// One request per calendar year, one record per year.
    Annual,
}

impl StationKind {
    /// Resolves the `STATION_TYPE` tag of a configuration group. A missing tag means
    /// [`StationKind::Series`].
    pub fn from_tag(tag: Option<&str>) -> Option<Self> {
        match tag {
            None | Some("Data") => Some(StationKind::Series),
            Some("Sotl") => Some(StationKind::Annual),
            Some(_) => None,
        }
    }
}

impl fmt::Display for StationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationKind::Series => write!(f, "series"),
            StationKind::Annual => write!(f, "annual"),
        }
    }
}

/// Normalized-series cache entry. `Insufficient` is the negative sentinel stored for
/// ranges whose series was too short to use.
#[derive(Debug, Clone)]
pub(crate) enum SeriesEntry {
    Ready(Arc<[DataPoint]>),
    Insufficient(usize),
}

/// State every station variant owns: identity, data types, and its two coalesced
/// caches (raw downloads and normalized series).
pub struct StationCore {
    name: String,
    url: String,
    coords: LatLon,
    data_types: Vec<DataType>,
    map_icon: Option<String>,
    transport: Arc<dyn JsonTransport>,
    downloads: RequestCoalescer<Arc<Value>>,
    series: RequestCoalescer<SeriesEntry>,
    negative_ttl: Duration,
}

#[bon]
impl StationCore {
    #[builder]
    pub fn new(
        #[builder(into)] name: String,
        #[builder(into)] url: String,
        coords: LatLon,
        data_types: Vec<DataType>,
        transport: Arc<dyn JsonTransport>,
        map_icon: Option<String>,
        cache_ttl: Option<Duration>,
        negative_ttl: Option<Duration>,
    ) -> Self {
        let cache_ttl = cache_ttl.unwrap_or(DEFAULT_CACHE_TTL);
        Self {
            name,
            url,
            coords,
            data_types,
            map_icon,
            transport,
            downloads: RequestCoalescer::new(cache_ttl),
            series: RequestCoalescer::new(cache_ttl),
            negative_ttl: negative_ttl.unwrap_or(DEFAULT_NEGATIVE_TTL),
        }
    }
}

impl StationCore {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn coords(&self) -> LatLon {
        self.coords
    }

    pub fn data_types(&self) -> &[DataType] {
        &self.data_types
    }

    pub fn map_icon(&self) -> Option<&str> {
        self.map_icon.as_deref()
    }

    /// Fetches the station URL with `params`, at most once per `key` while the cached
    /// payload is fresh.
    pub(crate) async fn fetch_data(
        &self,
        key: &str,
        params: &[(&str, String)],
    ) -> Result<Arc<Value>, StationError> {
        self.downloads
            .get_or_fetch(key, move || async move {
                info!("Downloading '{}' for station '{}'", key, self.name);
                self.transport
                    .get_json(&self.url, params)
                    .await
                    .map(Arc::new)
                    .map_err(|source| {
                        warn!("Download '{}' failed for station '{}'", key, self.name);
                        StationError::NetworkFailure {
                            station: self.name.clone(),
                            source,
                        }
                    })
            })
            .await
    }

    pub(crate) fn unexpected_payload(&self, message: impl Into<String>) -> StationError {
        StationError::UnexpectedPayload {
            station: self.name.clone(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_timestamp(&self, value: impl Into<String>) -> StationError {
        StationError::InvalidTimestamp {
            station: self.name.clone(),
            value: value.into(),
        }
    }
}

impl fmt::Debug for StationCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StationCore")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("coords", &self.coords)
            .field("data_types", &self.data_types)
            .finish_non_exhaustive()
    }
}

/// A remote source of environmental time series at a fixed location.
///
/// Variants only decide how raw data is downloaded ([`Self::get_raw_series`]) and how a
/// record's timestamp is read ([`Self::record_timestamp`]); normalization, validation
/// and caching are shared. Callers hold stations as `Arc<dyn StationSource>` and never
/// need the concrete type.
#[async_trait]
pub trait StationSource: Send + Sync + fmt::Debug {
    fn core(&self) -> &StationCore;

    fn kind(&self) -> StationKind;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn coords(&self) -> LatLon {
        self.core().coords()
    }

    fn data_types(&self) -> &[DataType] {
        self.core().data_types()
    }

    fn has_data_type(&self, data_type_name: &str) -> bool {
        self.data_type(data_type_name).is_some()
    }

    fn data_type(&self, data_type_name: &str) -> Option<&DataType> {
        self.data_types()
            .iter()
            .find(|data_type| data_type.name == data_type_name)
    }

    /// The raw JSON array of records covering `[start, end]`, fetched through the cache.
    async fn get_raw_series(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Arc<Value>, StationError>;

    /// Reads the canonical timestamp of one raw record.
    fn record_timestamp(&self, record: &Map<String, Value>) -> Result<DateTime<Utc>, StationError>;

    /// The normalized series for `[start, end]`, ascending by timestamp.
    ///
    /// # Errors
    ///
    /// [`StationError::InsufficientData`] when the series has two or fewer points; that
    /// outcome is cached for the range, so repeated calls do not refetch until it expires.
    /// Network, payload and conversion failures propagate and are not cached.
    async fn get_normalized_series(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Arc<[DataPoint]>, StationError> {
        let core = self.core();
        let range = DateRange::new(start, end);
        let key = format!("get_data-{}", range);
        let negative_ttl = core.negative_ttl;

        let entry = core
            .series
            .get_or_fetch_with_ttl(
                &key,
                |entry| matches!(entry, SeriesEntry::Insufficient(_)).then_some(negative_ttl),
                move || async move {
                    let raw = self.get_raw_series(start, end).await?;
                    let series = normalize_records(core.name(), &raw, core.data_types(), |r| {
                        self.record_timestamp(r)
                    })?;
                    if series.len() <= MIN_SERIES_POINTS {
                        warn!(
                            "Station '{}' returned {} data points for {}",
                            core.name(),
                            series.len(),
                            range
                        );
                        return Ok::<_, StationError>(SeriesEntry::Insufficient(series.len()));
                    }
                    Ok::<_, StationError>(SeriesEntry::Ready(series.into()))
                },
            )
            .await?;

        match entry {
            SeriesEntry::Ready(series) => Ok(series),
            SeriesEntry::Insufficient(points) => Err(StationError::InsufficientData {
                station: core.name().to_string(),
                points,
            }),
        }
    }

    /// The last point of [`Self::get_normalized_series`].
    async fn get_most_recent_data_point(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataPoint, StationError> {
        let series = self.get_normalized_series(start, end).await?;
        series
            .last()
            .cloned()
            .ok_or_else(|| StationError::InsufficientData {
                station: self.name().to_string(),
                points: 0,
            })
    }

    /// The most recent value of one data type, `None` if the station doesn't carry it.
    async fn get_most_recent_value(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        data_type_name: &str,
    ) -> Result<Option<f64>, StationError> {
        let point = self.get_most_recent_data_point(start, end).await?;
        Ok(point.get(data_type_name))
    }
}
