//! Shared entity types for the disaster intelligence fusion and routing
//! service (spec.md §3). Every other crate in the workspace — feed adapters,
//! confidence scorer, report service, alerting, safe zones, routing — reads
//! and writes these same record shapes through `store::DocumentStore`.

pub mod alerts;
pub mod event;
pub mod route;
pub mod safe_zone;
pub mod user;

pub use alerts::{AlertPreferences, MapSettings, Notification, QuietHours};
pub use event::{
    AiAnalysisStatus, AiBlend, ConfidenceBreakdown, ConfidenceFactor, ConfidenceLevel, DisasterEvent, DisasterType,
    Severity, Source, UserReport,
};
pub use route::{Route, RouteProvider};
pub use safe_zone::{OperationalStatus, SafeZone, SafeZoneSource, SafeZoneType};
pub use user::{CredibilityHistoryEntry, CredibilityLevel, UserProfile};
