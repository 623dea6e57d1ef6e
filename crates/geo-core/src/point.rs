use serde::{Deserialize, Serialize};

/// A WGS84 coordinate pair. Longitude/latitude order matches GeoJSON's
/// `[lon, lat]` convention wherever this type is serialized as an array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn distance_mi(&self, other: &GeoPoint) -> f64 {
        crate::haversine_mi(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    pub fn is_valid(&self) -> bool {
        crate::is_valid_coordinate(self.latitude, self.longitude)
    }
}
