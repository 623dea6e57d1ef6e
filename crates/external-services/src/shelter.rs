//! External shelter directory (HIFLD National Shelter System), spec.md
//! §4.7. One trait, one concrete HTTP-backed shape — the Safe-Zone Service
//! merges these results into its own local zone set.

use async_trait::async_trait;
use geo_core::GeoPoint;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ExternalShelter {
    pub external_id: String,
    pub name: String,
    pub location: GeoPoint,
    pub address: Option<String>,
    pub capacity: Option<u32>,
}

#[derive(Error, Debug)]
pub enum ShelterProviderError {
    #[error("shelter provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ShelterProvider: Send + Sync {
    async fn shelters_in_radius(&self, center: GeoPoint, radius_mi: f64) -> Result<Vec<ExternalShelter>, ShelterProviderError>;
    async fn shelter_by_id(&self, external_id: &str) -> Result<Option<ExternalShelter>, ShelterProviderError>;
}

/// HIFLD National Shelter System's ArcGIS FeatureServer, queried by a
/// lon/lat envelope.
pub struct HifldShelterProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HifldShelterProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://services1.arcgis.com/hifld/NationalShelterSystem/FeatureServer/0/query".to_string(),
        }
    }
}

impl Default for HifldShelterProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct HifldResponse {
    features: Vec<HifldFeature>,
}

#[derive(Deserialize)]
struct HifldFeature {
    attributes: HifldAttributes,
    geometry: HifldGeometry,
}

#[derive(Deserialize)]
struct HifldAttributes {
    #[serde(rename = "OBJECTID")]
    object_id: i64,
    #[serde(rename = "SHELTER_NAME")]
    shelter_name: Option<String>,
    #[serde(rename = "ADDRESS")]
    address: Option<String>,
    #[serde(rename = "CAPACITY")]
    capacity: Option<u32>,
}

#[derive(Deserialize)]
struct HifldGeometry {
    x: f64,
    y: f64,
}

fn feature_to_shelter(feature: HifldFeature) -> ExternalShelter {
    ExternalShelter {
        external_id: feature.attributes.object_id.to_string(),
        name: feature.attributes.shelter_name.unwrap_or_else(|| "Unnamed shelter".to_string()),
        location: GeoPoint::new(feature.geometry.y, feature.geometry.x),
        address: feature.attributes.address,
        capacity: feature.attributes.capacity,
    }
}

#[async_trait]
impl ShelterProvider for HifldShelterProvider {
    async fn shelters_in_radius(&self, center: GeoPoint, radius_mi: f64) -> Result<Vec<ExternalShelter>, ShelterProviderError> {
        let radius_m = radius_mi * 1609.344;
        let resp: HifldResponse = self
            .client
            .get(&self.base_url)
            .query(&[
                ("f", "json"),
                ("geometry", &format!("{},{}", center.longitude, center.latitude)),
                ("geometryType", "esriGeometryPoint"),
                ("distance", &radius_m.to_string()),
                ("units", "esriSRUnit_Meter"),
                ("outFields", "OBJECTID,SHELTER_NAME,ADDRESS,CAPACITY"),
            ])
            .timeout(std::time::Duration::from_secs(15))
            .send()
            .await
            .map_err(|e| ShelterProviderError::Unavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| ShelterProviderError::Unavailable(e.to_string()))?;

        Ok(resp.features.into_iter().map(feature_to_shelter).collect())
    }

    async fn shelter_by_id(&self, external_id: &str) -> Result<Option<ExternalShelter>, ShelterProviderError> {
        let resp: HifldResponse = self
            .client
            .get(&self.base_url)
            .query(&[
                ("f", "json"),
                ("where", &format!("OBJECTID={external_id}")),
                ("outFields", "OBJECTID,SHELTER_NAME,ADDRESS,CAPACITY"),
            ])
            .timeout(std::time::Duration::from_secs(15))
            .send()
            .await
            .map_err(|e| ShelterProviderError::Unavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| ShelterProviderError::Unavailable(e.to_string()))?;

        Ok(resp.features.into_iter().next().map(feature_to_shelter))
    }
}
