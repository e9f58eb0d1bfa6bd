use crate::transport::TransportError;
use crate::units::ConversionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StationError {
    #[error("Failed to download data from station '{station}'")]
    NetworkFailure {
        station: String,
        #[source]
        source: TransportError,
    },

    #[error("Station '{station}' doesn't contain enough data points ({points} data points)")]
    InsufficientData { station: String, points: usize },

    #[error(transparent)]
    UnsupportedConversion(#[from] ConversionError),

    #[error("Unexpected payload from station '{station}': {message}")]
    UnexpectedPayload { station: String, message: String },

    #[error("Station '{station}' reported an unreadable timestamp '{value}'")]
    InvalidTimestamp { station: String, value: String },
}
