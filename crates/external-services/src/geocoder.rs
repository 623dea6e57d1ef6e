//! Reverse geocoder: `reverse_geocode(lat, lon) -> {display_name, ...} | null`
//! per spec.md §6.3. Two implementations are provided: an HTTP-backed one for
//! production and a bounding-box fallback (ported from the country-bounding
//! logic the fusion core already needed for the confidence scorer's
//! AI-prompt location text) for when no geocoding endpoint is configured.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseGeocodeResult {
    pub display_name: String,
    pub country: Option<String>,
    pub state: Option<String>,
}

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("geocoder unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Option<ReverseGeocodeResult>, GeocodeError>;
}

/// Free, no-API-key reverse geocoder (Nominatim-shaped).
pub struct HttpGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGeocoder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn nominatim() -> Self {
        Self::new("https://nominatim.openstreetmap.org/reverse")
    }
}

#[derive(Deserialize)]
struct NominatimResponse {
    display_name: Option<String>,
    address: Option<NominatimAddress>,
}

#[derive(Deserialize)]
struct NominatimAddress {
    country_code: Option<String>,
    state: Option<String>,
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Option<ReverseGeocodeResult>, GeocodeError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("lat", lat.to_string()), ("lon", lon.to_string()), ("format", "jsonv2".into())])
            .header("User-Agent", "disaster-intel-gateway/0.1")
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| GeocodeError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Ok(None);
        }

        let parsed: NominatimResponse = resp
            .json()
            .await
            .map_err(|e| GeocodeError::Unavailable(e.to_string()))?;

        Ok(parsed.display_name.map(|display_name| ReverseGeocodeResult {
            display_name,
            country: parsed.address.as_ref().and_then(|a| a.country_code.clone()),
            state: parsed.address.and_then(|a| a.state),
        }))
    }
}

/// Bounding-box country lookup, used when no geocoding endpoint is
/// configured. Coarse on purpose — only good enough to produce a location
/// string for the AI prompt and to tag `country`/`state` on adapter events.
pub struct BoundingBoxGeocoder;

const COUNTRY_BOUNDS: &[(f64, f64, f64, f64, &str, &str)] = &[
    (24.5, 49.5, -125.0, -66.0, "US", "United States"),
    (41.5, 83.0, -141.0, -52.0, "CA", "Canada"),
    (14.5, 32.7, -118.4, -86.7, "MX", "Mexico"),
    (49.0, 61.0, -8.0, 2.0, "GB", "United Kingdom"),
    (41.3, 51.1, -5.0, 9.6, "FR", "France"),
    (47.3, 55.1, 5.9, 15.0, "DE", "Germany"),
    (-44.0, -10.0, 113.0, 154.0, "AU", "Australia"),
    (30.0, 45.5, 129.4, 145.8, "JP", "Japan"),
    (18.2, 53.6, 73.7, 135.1, "CN", "China"),
    (6.7, 35.5, 68.2, 97.4, "IN", "India"),
    (-33.8, 5.3, -73.9, -34.8, "BR", "Brazil"),
];

#[async_trait]
impl Geocoder for BoundingBoxGeocoder {
    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Option<ReverseGeocodeResult>, GeocodeError> {
        for &(lat_min, lat_max, lon_min, lon_max, code, name) in COUNTRY_BOUNDS {
            if lat >= lat_min && lat <= lat_max && lon >= lon_min && lon <= lon_max {
                return Ok(Some(ReverseGeocodeResult {
                    display_name: format!("near {lat:.2}, {lon:.2} ({name})"),
                    country: Some(code.to_string()),
                    state: None,
                }));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bbox_geocoder_finds_known_country() {
        let geocoder = BoundingBoxGeocoder;
        let result = geocoder.reverse_geocode(34.05, -118.25).await.unwrap();
        assert_eq!(result.unwrap().country, Some("US".to_string()));
    }

    #[tokio::test]
    async fn bbox_geocoder_returns_none_for_open_ocean() {
        let geocoder = BoundingBoxGeocoder;
        let result = geocoder.reverse_geocode(0.0, -150.0).await.unwrap();
        assert!(result.is_none());
    }
}
