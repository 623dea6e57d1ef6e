//! Safe-Zone Service (spec.md §4.7): nearest-zone lookup over a local zone
//! set merged with an external shelter directory, plus a zone-vs-active-
//! disaster threat check.

use domain_model::event::{DisasterType, Severity};
use domain_model::safe_zone::{OperationalStatus, SafeZone, SafeZoneSource, SafeZoneType};
use geo_core::GeoPoint;
use std::collections::HashMap;
use std::sync::Arc;
use store::{DocumentStore, DocumentStoreExt};
use thiserror::Error;
use tokio::sync::RwLock;

pub use external_services::shelter::{ExternalShelter, ShelterProvider, ShelterProviderError};

#[derive(Error, Debug)]
pub enum SafeZoneError {
    #[error("invalid coordinates: ({0}, {1})")]
    InvalidCoordinates(f64, f64),
    #[error("document store error: {0}")]
    Store(#[from] store::StoreError),
    #[error("external shelter provider error: {0}")]
    Shelter(#[from] ShelterProviderError),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct NearestZone {
    pub zone: SafeZone,
    pub distance_from_user_mi: f64,
}

#[derive(Debug, Clone)]
pub struct ThreatCandidate {
    pub id: String,
    pub disaster_type: DisasterType,
    pub severity: Severity,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct NearestThreat {
    pub id: String,
    pub disaster_type: DisasterType,
    pub severity: Severity,
    pub distance_mi: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ZoneSafetyResult {
    pub safe: bool,
    pub threats: Vec<String>,
    pub distance_to_nearest_threat_mi: Option<f64>,
    pub nearest_threat: Option<NearestThreat>,
}

/// Coordinate-match tolerance for resolving a coordinate-encoded external ID
/// back to a specific shelter record (~111m, spec.md's HIFLD lookup detail).
const COORDINATE_MATCH_TOLERANCE: f64 = 0.001;

fn zone_path(zone_id: &str) -> String {
    format!("safe_zones/{zone_id}")
}

fn external_shelter_to_zone(shelter: &ExternalShelter, now: chrono::DateTime<chrono::Utc>) -> SafeZone {
    SafeZone {
        id: format!("hifld:{}", shelter.external_id),
        name: shelter.name.clone(),
        zone_type: SafeZoneType::EmergencyShelter,
        location: shelter.location,
        address: shelter.address.clone(),
        capacity: shelter.capacity,
        amenities: Vec::new(),
        contact: None,
        operational_status: OperationalStatus::Unknown,
        source: SafeZoneSource::HifldNss,
        last_updated: now,
    }
}

pub struct SafeZoneService {
    store: Arc<dyn DocumentStore>,
    shelter_provider: Option<Arc<dyn ShelterProvider>>,
    /// Memoizes numeric external-ID lookups — shelters change infrequently
    /// and `shelter_by_id` is a network round trip (spec.md §4.7).
    numeric_id_cache: RwLock<HashMap<u64, Option<ExternalShelter>>>,
}

impl SafeZoneService {
    pub fn new(store: Arc<dyn DocumentStore>, shelter_provider: Option<Arc<dyn ShelterProvider>>) -> Self {
        Self { store, shelter_provider, numeric_id_cache: RwLock::new(HashMap::new()) }
    }

    pub async fn get_nearest_safe_zones(
        &self,
        location: GeoPoint,
        limit: usize,
        max_distance_mi: f64,
        zone_types: Option<&[SafeZoneType]>,
        include_external: bool,
    ) -> Result<Vec<NearestZone>, SafeZoneError> {
        if !location.is_valid() {
            return Err(SafeZoneError::InvalidCoordinates(location.latitude, location.longitude));
        }

        let rows = self.store.list_prefix("safe_zones/").await?;
        let mut results: Vec<NearestZone> = rows
            .into_iter()
            .filter_map(|(_, v)| serde_json::from_value::<SafeZone>(v).ok())
            .filter_map(|zone| {
                let distance = location.distance_mi(&zone.location);
                if distance > max_distance_mi {
                    return None;
                }
                if let Some(types) = zone_types {
                    if !types.contains(&zone.zone_type) {
                        return None;
                    }
                }
                Some(NearestZone { zone, distance_from_user_mi: distance })
            })
            .collect();

        if include_external {
            if let Some(provider) = &self.shelter_provider {
                match provider.shelters_in_radius(location, max_distance_mi).await {
                    Ok(shelters) => {
                        let now = chrono::Utc::now();
                        let external_matches_filter =
                            zone_types.map(|types| types.contains(&SafeZoneType::EmergencyShelter)).unwrap_or(true);
                        if external_matches_filter {
                            for shelter in &shelters {
                                let distance = location.distance_mi(&shelter.location);
                                if distance > max_distance_mi {
                                    continue;
                                }
                                results.push(NearestZone { zone: external_shelter_to_zone(shelter, now), distance_from_user_mi: distance });
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "external shelter provider unavailable, serving local zones only");
                    }
                }
            }
        }

        results.sort_by(|a, b| a.distance_from_user_mi.partial_cmp(&b.distance_from_user_mi).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);
        Ok(results)
    }

    /// Resolves a zone ID to its record. Accepts three shapes: a plain local
    /// zone ID, `hifld:<numeric-id>` (memoized), and `hifld:<lat>,<lon>`
    /// (coordinate-encoded, resolved via a 1-mile radius lookup).
    pub async fn get_zone_by_id(&self, zone_id: &str) -> Result<Option<SafeZone>, SafeZoneError> {
        let Some(rest) = zone_id.strip_prefix("hifld:") else {
            return Ok(self.store.get_typed::<SafeZone>(&zone_path(zone_id)).await?);
        };
        let Some(provider) = &self.shelter_provider else { return Ok(None) };

        if let Ok(numeric_id) = rest.parse::<u64>() {
            if let Some(cached) = self.numeric_id_cache.read().await.get(&numeric_id) {
                return Ok(cached.as_ref().map(|s| external_shelter_to_zone(s, chrono::Utc::now())));
            }
            let shelter = provider.shelter_by_id(rest).await.map_err(|e| {
                tracing::warn!(error = %e, "external shelter lookup by numeric id failed");
                e
            });
            let shelter = shelter.unwrap_or(None);
            self.numeric_id_cache.write().await.insert(numeric_id, shelter.clone());
            return Ok(shelter.as_ref().map(|s| external_shelter_to_zone(s, chrono::Utc::now())));
        }

        let Some((lat_raw, lon_raw)) = rest.split_once(',') else { return Ok(None) };
        let (Ok(lat), Ok(lon)) = (lat_raw.parse::<f64>(), lon_raw.parse::<f64>()) else { return Ok(None) };
        let point = GeoPoint::new(lat, lon);

        let shelters = provider.shelters_in_radius(point, 1.0).await?;
        let matched = shelters.into_iter().find(|s| {
            (s.location.latitude - lat).abs() < COORDINATE_MATCH_TOLERANCE && (s.location.longitude - lon).abs() < COORDINATE_MATCH_TOLERANCE
        });
        Ok(matched.map(|s| external_shelter_to_zone(&s, chrono::Utc::now())))
    }

    /// Whether `zone_id` currently has any disaster within `threat_radius_mi`
    /// (spec.md §4.7's default is 3.1 mi, callers set their own).
    pub async fn is_zone_safe(&self, zone_id: &str, current_disasters: &[ThreatCandidate], threat_radius_mi: f64) -> Result<ZoneSafetyResult, SafeZoneError> {
        let Some(zone) = self.get_zone_by_id(zone_id).await? else {
            return Ok(ZoneSafetyResult { safe: false, threats: Vec::new(), distance_to_nearest_threat_mi: None, nearest_threat: None });
        };

        let mut threats = Vec::new();
        let mut nearest_threat: Option<NearestThreat> = None;
        let mut min_distance = f64::MAX;

        for disaster in current_disasters {
            let distance = zone.location.distance_mi(&disaster.location);
            if distance <= threat_radius_mi {
                threats.push(disaster.id.clone());
            }
            if distance < min_distance {
                min_distance = distance;
                nearest_threat = Some(NearestThreat {
                    id: disaster.id.clone(),
                    disaster_type: disaster.disaster_type,
                    severity: disaster.severity,
                    distance_mi: distance,
                });
            }
        }

        Ok(ZoneSafetyResult {
            safe: threats.is_empty(),
            threats,
            distance_to_nearest_threat_mi: if min_distance == f64::MAX { None } else { Some(min_distance) },
            nearest_threat,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use store::InMemoryStore;

    fn sample_zone(id: &str, lat: f64, lon: f64) -> SafeZone {
        SafeZone {
            id: id.to_string(),
            name: "Test Zone".to_string(),
            zone_type: SafeZoneType::EvacuationCenter,
            location: GeoPoint::new(lat, lon),
            address: None,
            capacity: Some(200),
            amenities: Vec::new(),
            contact: None,
            operational_status: OperationalStatus::Open,
            source: SafeZoneSource::Manual,
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn nearest_zones_filters_by_distance_and_sorts() {
        let store = Arc::new(InMemoryStore::default());
        store.set_typed(&zone_path("z1"), &sample_zone("z1", 34.10, -118.25)).await.unwrap();
        store.set_typed(&zone_path("z2"), &sample_zone("z2", 40.0, -74.0)).await.unwrap();

        let service = SafeZoneService::new(store, None);
        let results = service
            .get_nearest_safe_zones(GeoPoint::new(34.05, -118.25), 5, 50.0, None, false)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].zone.id, "z1");
    }

    #[tokio::test]
    async fn rejects_invalid_coordinates() {
        let store = Arc::new(InMemoryStore::default());
        let service = SafeZoneService::new(store, None);
        let err = service.get_nearest_safe_zones(GeoPoint::new(200.0, 0.0), 5, 50.0, None, false).await;
        assert!(matches!(err, Err(SafeZoneError::InvalidCoordinates(_, _))));
    }

    #[tokio::test]
    async fn is_zone_safe_detects_threat_in_radius() {
        let store = Arc::new(InMemoryStore::default());
        store.set_typed(&zone_path("z1"), &sample_zone("z1", 34.10, -118.25)).await.unwrap();
        let service = SafeZoneService::new(store, None);

        let disasters = vec![ThreatCandidate {
            id: "usgs:1".to_string(),
            disaster_type: DisasterType::Earthquake,
            severity: Severity::High,
            location: GeoPoint::new(34.11, -118.25),
        }];

        let result = service.is_zone_safe("z1", &disasters, 3.1).await.unwrap();
        assert!(!result.safe);
        assert_eq!(result.threats, vec!["usgs:1".to_string()]);
    }

    #[tokio::test]
    async fn is_zone_safe_reports_unknown_zone_as_unsafe() {
        let store = Arc::new(InMemoryStore::default());
        let service = SafeZoneService::new(store, None);
        let result = service.is_zone_safe("missing", &[], 3.1).await.unwrap();
        assert!(!result.safe);
        assert!(result.nearest_threat.is_none());
    }
}
