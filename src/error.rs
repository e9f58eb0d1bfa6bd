use crate::config::ConfigError;
use crate::prefetch::prefetcher::PrefetchError;
use crate::registry::RegistryError;
use crate::stations::error::StationError;
use crate::transport::TransportError;
use crate::units::ConversionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LakestatError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Station(#[from] StationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Prefetch(#[from] PrefetchError),
}
