//! Proximity Alert Service (spec.md §4.6): scans every feed cache and all
//! user reports for records near a point, escalates severity by distance,
//! and — for authenticated callers outside quiet hours — materializes
//! previously-unseen high/critical alerts as notifications.

use chrono::{DateTime, Timelike, Utc};
use domain_model::alerts::{Notification, QuietHours, NOTIFICATION_TTL_HOURS};
use domain_model::event::{DisasterType, Severity, Source};
use domain_model::UserReport;
use feed_cache::{FeedCacheManager, FeedType};
use geo_core::{BoundingBox, GeoPoint};
use std::collections::HashSet;
use std::sync::Arc;
use store::{DocumentStore, DocumentStoreExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProximityAlertError {
    #[error("document store error: {0}")]
    Store(#[from] store::StoreError),
}

fn notification_path(user_id: &str, disaster_id: &str) -> String {
    format!("user_notifications/{user_id}/alerts/{disaster_id}")
}

#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub location: GeoPoint,
    pub radius_mi: f64,
    pub severity_filter: Option<HashSet<Severity>>,
    pub disaster_types: Option<HashSet<DisasterType>>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProximityAlert {
    pub disaster_id: String,
    pub disaster_type: DisasterType,
    pub source: Source,
    pub severity: Severity,
    pub alert_severity: Severity,
    pub distance_mi: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ScanResult {
    pub alerts: Vec<ProximityAlert>,
    pub highest_severity: Option<Severity>,
    pub count: usize,
    pub closest_distance: Option<f64>,
}

/// Distance/severity escalation bands, spec.md §4.6 exactly.
fn escalate(severity: Severity, distance_mi: f64) -> Severity {
    let is_high_or_critical = matches!(severity, Severity::High | Severity::Critical);
    let is_medium_plus = matches!(severity, Severity::Medium | Severity::High | Severity::Critical);

    if is_high_or_critical && distance_mi <= 5.0 {
        Severity::Critical
    } else if is_high_or_critical && distance_mi <= 15.0 {
        Severity::High
    } else if is_medium_plus && distance_mi <= 30.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Current UTC HH:MM falls inside `[start, end]`, wrapping across midnight
/// when `start > end` (spec.md §4.6).
pub fn in_quiet_hours(quiet: &QuietHours, now: DateTime<Utc>) -> bool {
    if !quiet.enabled {
        return false;
    }
    let (Some(start), Some(end)) = (parse_hhmm(&quiet.start), parse_hhmm(&quiet.end)) else {
        return false;
    };
    let current = now.hour() * 60 + now.minute();

    if start <= end {
        (start..=end).contains(&current)
    } else {
        current >= start || current <= end
    }
}

fn parse_hhmm(raw: &str) -> Option<u32> {
    let (h, m) = raw.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

pub struct ProximityAlertService {
    store: Arc<dyn DocumentStore>,
    feed_cache: Arc<FeedCacheManager>,
}

impl ProximityAlertService {
    pub fn new(store: Arc<dyn DocumentStore>, feed_cache: Arc<FeedCacheManager>) -> Self {
        Self { store, feed_cache }
    }

    async fn user_report_candidates(&self) -> Vec<(String, Source, DisasterType, Severity, GeoPoint, DateTime<Utc>)> {
        let rows = self.store.list_prefix("reports/").await.unwrap_or_default();
        rows.into_iter()
            .filter_map(|(_, v)| serde_json::from_value::<UserReport>(v).ok())
            .map(|r| {
                (
                    r.event.id,
                    r.event.source,
                    r.event.disaster_type,
                    r.event.severity,
                    GeoPoint::new(r.event.latitude, r.event.longitude),
                    r.event.timestamp,
                )
            })
            .collect()
    }

    /// Scans every feed cache plus all user reports for records within
    /// `req.radius_mi` of `req.location`. A bounding-box prefilter bounds
    /// per-record cost before the exact haversine check (spec.md §4.6).
    pub async fn scan(&self, req: &ScanRequest) -> ScanResult {
        let bbox = BoundingBox::around(req.location, req.radius_mi);
        let mut alerts = Vec::new();

        for feed_type in FeedType::all() {
            for event in self.feed_cache.get_cached_data(feed_type).await {
                let point = GeoPoint::new(event.latitude, event.longitude);
                if !bbox.contains(point) {
                    continue;
                }
                let distance = req.location.distance_mi(&point);
                if distance > req.radius_mi {
                    continue;
                }
                if let Some(types) = &req.disaster_types {
                    if !types.contains(&event.disaster_type) {
                        continue;
                    }
                }
                let alert_severity = escalate(event.severity, distance);
                if let Some(filter) = &req.severity_filter {
                    if !filter.contains(&alert_severity) {
                        continue;
                    }
                }
                alerts.push(ProximityAlert {
                    disaster_id: event.id,
                    disaster_type: event.disaster_type,
                    source: event.source,
                    severity: event.severity,
                    alert_severity,
                    distance_mi: distance,
                    latitude: event.latitude,
                    longitude: event.longitude,
                    timestamp: event.timestamp,
                });
            }
        }

        for (id, source, disaster_type, severity, point, timestamp) in self.user_report_candidates().await {
            if !bbox.contains(point) {
                continue;
            }
            let distance = req.location.distance_mi(&point);
            if distance > req.radius_mi {
                continue;
            }
            if let Some(types) = &req.disaster_types {
                if !types.contains(&disaster_type) {
                    continue;
                }
            }
            let alert_severity = escalate(severity, distance);
            if let Some(filter) = &req.severity_filter {
                if !filter.contains(&alert_severity) {
                    continue;
                }
            }
            alerts.push(ProximityAlert {
                disaster_id: id,
                disaster_type,
                source,
                severity,
                alert_severity,
                distance_mi: distance,
                latitude: point.latitude,
                longitude: point.longitude,
                timestamp,
            });
        }

        alerts.sort_by(|a, b| a.distance_mi.partial_cmp(&b.distance_mi).unwrap_or(std::cmp::Ordering::Equal));

        let highest_severity = alerts.iter().map(|a| a.alert_severity).max();
        let closest_distance = alerts.first().map(|a| a.distance_mi);
        let count = alerts.len();

        ScanResult { alerts, highest_severity, count, closest_distance }
    }

    /// Persists previously-unseen high/critical alerts as notifications for
    /// an authenticated user, unless quiet hours suppress materialization.
    /// Query responses (`scan`) are unaffected by quiet hours (spec.md §4.6).
    pub async fn materialize_notifications(
        &self,
        user_id: &str,
        alerts: &[ProximityAlert],
        quiet_hours: &QuietHours,
        now: DateTime<Utc>,
    ) -> Result<Vec<Notification>, ProximityAlertError> {
        if in_quiet_hours(quiet_hours, now) {
            return Ok(Vec::new());
        }

        let mut created = Vec::new();
        for alert in alerts {
            if !matches!(alert.alert_severity, Severity::High | Severity::Critical) {
                continue;
            }
            let path = notification_path(user_id, &alert.disaster_id);
            if self.store.get(&path).await?.is_some() {
                continue;
            }

            let notification = Notification {
                id: uuid::Uuid::new_v4().to_string(),
                disaster_id: alert.disaster_id.clone(),
                disaster_type: alert.disaster_type,
                severity: alert.severity,
                alert_severity: alert.alert_severity,
                distance_mi: alert.distance_mi,
                latitude: alert.latitude,
                longitude: alert.longitude,
                source: alert.source,
                timestamp: alert.timestamp,
                acknowledged: false,
                acknowledged_at: None,
                expires_at: now + chrono::Duration::hours(NOTIFICATION_TTL_HOURS),
            };
            self.store.set_typed(&path, &notification).await?;
            created.push(notification);
        }

        Ok(created)
    }

    /// All unexpired notifications for a user, most recent first.
    pub async fn list_notifications(&self, user_id: &str, now: DateTime<Utc>) -> Vec<Notification> {
        let prefix = format!("user_notifications/{user_id}/alerts/");
        let rows = self.store.list_prefix(&prefix).await.unwrap_or_default();
        let mut notifications: Vec<Notification> = rows
            .into_iter()
            .filter_map(|(_, v)| serde_json::from_value::<Notification>(v).ok())
            .filter(|n| !n.is_expired(now))
            .collect();
        notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        notifications
    }

    pub async fn acknowledge(&self, user_id: &str, notification_id: &str, now: DateTime<Utc>) -> Result<bool, ProximityAlertError> {
        let prefix = format!("user_notifications/{user_id}/alerts/");
        let rows = self.store.list_prefix(&prefix).await?;
        for (path, v) in rows {
            let Ok(mut notification) = serde_json::from_value::<Notification>(v) else { continue };
            if notification.id == notification_id {
                notification.acknowledge(now);
                self.store.set_typed(&path, &notification).await?;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_model::event::{ConfidenceBreakdown, ConfidenceLevel};
    use domain_model::DisasterEvent;
    use store::InMemoryStore;

    fn sample_event(id: &str, lat: f64, lon: f64, severity: Severity) -> DisasterEvent {
        DisasterEvent {
            id: id.to_string(),
            source: Source::Usgs,
            disaster_type: DisasterType::Earthquake,
            latitude: lat,
            longitude: lon,
            severity,
            timestamp: Utc::now(),
            description: None,
            location_name: None,
            magnitude: Some(6.5),
            brightness: None,
            frp: None,
            acres_burned: None,
            percent_contained: None,
            alert_level: None,
            country: None,
            state: None,
            image_url: None,
            confidence_score: 0.9,
            confidence_level: ConfidenceLevel::High,
            confidence_breakdown: ConfidenceBreakdown::empty(),
            time_decay: None,
        }
    }

    #[test]
    fn escalation_bands_match_spec() {
        assert_eq!(escalate(Severity::Critical, 3.0), Severity::Critical);
        assert_eq!(escalate(Severity::High, 10.0), Severity::High);
        assert_eq!(escalate(Severity::Medium, 25.0), Severity::Medium);
        assert_eq!(escalate(Severity::Low, 1.0), Severity::Low);
        assert_eq!(escalate(Severity::Critical, 40.0), Severity::Low);
    }

    #[test]
    fn quiet_hours_wraps_across_midnight() {
        let quiet = QuietHours { enabled: true, start: "22:00".to_string(), end: "07:00".to_string() };
        let at_2300 = Utc::now().with_hour(23).unwrap().with_minute(0).unwrap();
        let at_1200 = Utc::now().with_hour(12).unwrap().with_minute(0).unwrap();
        assert!(in_quiet_hours(&quiet, at_2300));
        assert!(!in_quiet_hours(&quiet, at_1200));
    }

    #[tokio::test]
    async fn scan_filters_by_radius_and_sorts_by_distance() {
        let store = Arc::new(InMemoryStore::default());
        let feed_cache = Arc::new(FeedCacheManager::new(store.clone()));
        feed_cache
            .update_cache(
                FeedType::Usgs,
                vec![sample_event("usgs:1", 34.10, -118.25, Severity::Critical), sample_event("usgs:2", 36.0, -120.0, Severity::Critical)],
            )
            .await
            .unwrap();

        let service = ProximityAlertService::new(store, feed_cache);
        let req = ScanRequest { location: GeoPoint::new(34.05, -118.25), radius_mi: 50.0, severity_filter: None, disaster_types: None };
        let result = service.scan(&req).await;

        assert_eq!(result.count, 1);
        assert_eq!(result.alerts[0].disaster_id, "usgs:1");
        assert_eq!(result.highest_severity, Some(Severity::Critical));
    }

    #[tokio::test]
    async fn materialize_skips_previously_seen_and_low_severity() {
        let store = Arc::new(InMemoryStore::default());
        let feed_cache = Arc::new(FeedCacheManager::new(store.clone()));
        let service = ProximityAlertService::new(store, feed_cache);

        let alerts = vec![
            ProximityAlert {
                disaster_id: "usgs:1".to_string(),
                disaster_type: DisasterType::Earthquake,
                source: Source::Usgs,
                severity: Severity::Critical,
                alert_severity: Severity::Critical,
                distance_mi: 2.0,
                latitude: 34.0,
                longitude: -118.0,
                timestamp: Utc::now(),
            },
            ProximityAlert {
                disaster_id: "usgs:2".to_string(),
                disaster_type: DisasterType::Earthquake,
                source: Source::Usgs,
                severity: Severity::Low,
                alert_severity: Severity::Low,
                distance_mi: 40.0,
                latitude: 34.0,
                longitude: -118.0,
                timestamp: Utc::now(),
            },
        ];
        let quiet = QuietHours::default();
        let now = Utc::now();

        let created = service.materialize_notifications("user-1", &alerts, &quiet, now).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].disaster_id, "usgs:1");

        let created_again = service.materialize_notifications("user-1", &alerts, &quiet, now).await.unwrap();
        assert!(created_again.is_empty());
    }
}
