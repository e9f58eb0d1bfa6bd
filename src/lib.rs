mod board;
mod cache;
mod config;
mod error;
mod prefetch;
mod registry;
mod stations;
mod transport;
mod types;
mod units;

#[cfg(test)]
mod testing;

pub use error::LakestatError;

pub use cache::coalescer::RequestCoalescer;
pub use cache::ttl_cache::TtlCache;
pub use units::{ConversionError, UnitConverter};

pub use config::{ConfigError, StationEntry, StationGroup, StationsConfig};
pub use registry::{RegistryError, StationRegistry};
pub use transport::{HttpTransport, JsonTransport, TransportError};

pub use stations::annual_station::AnnualStation;
pub use stations::error::StationError;
pub use stations::normalize::MIN_SERIES_POINTS;
pub use stations::series_station::SeriesStation;
pub use stations::source::{
    StationCore, StationKind, StationSource, DEFAULT_CACHE_TTL, DEFAULT_NEGATIVE_TTL,
};

pub use types::data_point::{DataPoint, TIMESTAMP_FIELD};
pub use types::data_type::{DataType, DataTypeOverride};
pub use types::location::LatLon;
pub use types::period::{DateRange, Year};

pub use board::{BoardSnapshot, ConditionsBoard, Selection, StationMarker, Status};

pub use prefetch::artifact::{Artifact, ArtifactListing, ArtifactState, Matrix, MatrixPair};
pub use prefetch::prefetcher::{
    window_bounds, ArtifactList, PrefetchError, WindowedPrefetcher, DEFAULT_WINDOW_SIZE,
};
pub use prefetch::store::{ArtifactStore, HttpArtifactStore};
