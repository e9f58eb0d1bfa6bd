use haversine::{distance, Location as HaversineLocation, Units};
use serde::{Deserialize, Serialize};

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
/// Station configuration stores coordinates as a `[lat, lng]` pair, which deserializes
/// straight into this type.
///
/// # Examples
///
/// ```
/// use lakestat::LatLon;
///
/// let tahoe_city = LatLon(39.1677, -120.1452);
/// assert_eq!(tahoe_city.0, 39.1677); // Latitude
/// assert_eq!(tahoe_city.1, -120.1452); // Longitude
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    /// Great-circle distance in kilometers.
    pub fn distance_km(&self, other: &LatLon) -> f64 {
        distance(
            HaversineLocation {
                latitude: self.0,
                longitude: self.1,
            },
            HaversineLocation {
                latitude: other.0,
                longitude: other.1,
            },
            Units::Kilometers,
        )
    }
}
