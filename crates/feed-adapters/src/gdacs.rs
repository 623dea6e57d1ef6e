//! GDACS (Global Disaster Alert and Coordination System) — RSS+GeoRSS feed,
//! the one non-JSON upstream, parsed with `quick-xml`.

use crate::common::{coordinates_valid, score_adapter_internal_event};
use crate::{AdapterError, FeedAdapter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use confidence_scorer::official::{IntensitySignal, OfficialCompleteness};
use domain_model::event::{DisasterType, Severity, Source};
use domain_model::DisasterEvent;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

const GDACS_RSS_URL: &str = "https://www.gdacs.org/xml/rss.xml";

#[derive(Default)]
struct RawItem {
    title: Option<String>,
    description: Option<String>,
    point: Option<(f64, f64)>,
    pub_date: Option<String>,
    alert_level: Option<String>,
    event_type: Option<String>,
}

fn event_type_to_disaster_type(raw: &str) -> DisasterType {
    match raw.to_ascii_uppercase().as_str() {
        "EQ" => DisasterType::Earthquake,
        "TC" => DisasterType::Hurricane,
        "FL" => DisasterType::Flood,
        "VO" => DisasterType::Volcano,
        "DR" => DisasterType::Drought,
        "WF" => DisasterType::Wildfire,
        _ => DisasterType::Other,
    }
}

fn alert_level_to_severity(raw: &str) -> Severity {
    match raw.to_ascii_uppercase().as_str() {
        "RED" => Severity::Critical,
        "ORANGE" => Severity::High,
        "GREEN" => Severity::Low,
        _ => Severity::Medium,
    }
}

/// GeoRSS `<geo:point>54.2 12.4</geo:point>` is "lat lon" space-separated.
fn parse_geo_point(raw: &str) -> Option<(f64, f64)> {
    let mut parts = raw.split_whitespace();
    let lat = parts.next()?.parse::<f64>().ok()?;
    let lon = parts.next()?.parse::<f64>().ok()?;
    Some((lat, lon))
}

fn parse_items(body: &str) -> Vec<RawItem> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<RawItem> = None;
    let mut tag_stack: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "item" {
                    current = Some(RawItem::default());
                }
                tag_stack.push(name);
            }
            Ok(Event::Text(t)) => {
                let Some(item) = current.as_mut() else { continue };
                let Some(tag) = tag_stack.last() else { continue };
                let text = t.unescape().unwrap_or_default().to_string();
                match tag.as_str() {
                    "title" => item.title = Some(text),
                    "description" => item.description = Some(text),
                    "pubDate" => item.pub_date = Some(text),
                    "geo:point" | "point" => item.point = parse_geo_point(&text),
                    "gdacs:alertlevel" => item.alert_level = Some(text),
                    "gdacs:eventtype" => item.event_type = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "item" {
                    if let Some(item) = current.take() {
                        items.push(item);
                    }
                }
                tag_stack.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::warn!(error = %e, "GDACS feed had malformed XML, stopping parse early");
                break;
            }
            _ => {}
        }
    }

    items
}

pub struct GdacsAdapter {
    client: reqwest::Client,
}

impl Default for GdacsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl GdacsAdapter {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

#[async_trait]
impl FeedAdapter for GdacsAdapter {
    fn source_name(&self) -> &'static str {
        "gdacs"
    }

    async fn fetch(&self, _window_days: u32) -> Result<Vec<DisasterEvent>, AdapterError> {
        let body = self
            .client
            .get(GDACS_RSS_URL)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AdapterError::RequestFailed(e.to_string()))?
            .text()
            .await
            .map_err(|e| AdapterError::RequestFailed(e.to_string()))?;

        let now = Utc::now();
        let mut events = Vec::new();

        for item in parse_items(&body) {
            let Some((lat, lon)) = item.point else { continue };
            if !coordinates_valid(lat, lon) {
                continue;
            }
            let Some(timestamp) = item.pub_date.as_deref().and_then(parse_rfc2822_ish) else { continue };

            let disaster_type = item.event_type.as_deref().map(event_type_to_disaster_type).unwrap_or(DisasterType::Other);
            let severity = item.alert_level.as_deref().map(alert_level_to_severity).unwrap_or(Severity::Medium);

            let id = format!("gdacs:{}:{}", timestamp.timestamp(), lat.to_bits());

            let completeness = OfficialCompleteness {
                required_field_count: 2,
                present_field_count: usize::from(item.title.is_some()) + usize::from(item.description.is_some()),
            };
            let (score, breakdown) = score_adapter_internal_event(Source::Gdacs, disaster_type, timestamp, now, completeness, IntensitySignal::None);

            let mut event = DisasterEvent {
                id,
                source: Source::Gdacs,
                disaster_type,
                latitude: lat,
                longitude: lon,
                severity,
                timestamp,
                description: item.description,
                location_name: item.title,
                magnitude: None,
                brightness: None,
                frp: None,
                acres_burned: None,
                percent_contained: None,
                alert_level: item.alert_level,
                country: None,
                state: None,
                image_url: None,
                confidence_score: 0.0,
                confidence_level: domain_model::event::ConfidenceLevel::Low,
                confidence_breakdown: domain_model::event::ConfidenceBreakdown::empty(),
                time_decay: None,
            };
            event.set_confidence(score, breakdown);
            events.push(event);
        }

        Ok(events)
    }
}

fn parse_rfc2822_ish(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw).ok().map(|dt| dt.with_timezone(&Utc))
}
