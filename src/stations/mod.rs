pub mod annual_station;
pub mod error;
pub(crate) mod normalize;
pub mod series_station;
pub mod source;
