use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafeZoneType {
    EvacuationCenter,
    Hospital,
    FireStation,
    EmergencyShelter,
    PoliceStation,
    CommunityCenter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationalStatus {
    Open,
    Closed,
    AtCapacity,
    Damaged,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafeZoneSource {
    Manual,
    HifldNss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafeZone {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub zone_type: SafeZoneType,
    pub location: geo_core::GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    pub operational_status: OperationalStatus,
    pub source: SafeZoneSource,
    pub last_updated: DateTime<Utc>,
}

impl SafeZone {
    pub fn is_usable(&self) -> bool {
        matches!(self.operational_status, OperationalStatus::Open | OperationalStatus::AtCapacity)
    }
}
