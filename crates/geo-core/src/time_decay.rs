//! Time-Decay Service — a pure function from event age to display opacity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DecayCategory {
    Fresh,
    Recent,
    Old,
    Stale,
    VeryStale,
    Unknown,
}

impl DecayCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecayCategory::Fresh => "fresh",
            DecayCategory::Recent => "recent",
            DecayCategory::Old => "old",
            DecayCategory::Stale => "stale",
            DecayCategory::VeryStale => "very_stale",
            DecayCategory::Unknown => "unknown",
        }
    }

    pub fn opacity(&self) -> f64 {
        match self {
            DecayCategory::Fresh => 1.0,
            DecayCategory::Recent => 0.8,
            DecayCategory::Old => 0.6,
            DecayCategory::Stale => 0.4,
            DecayCategory::VeryStale => 0.2,
            DecayCategory::Unknown => 0.5,
        }
    }
}

/// Computed decay for a single event, as handed to the mapping client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeDecay {
    pub age_hours: Option<f64>,
    pub category: DecayCategory,
    pub decay_score: f64,
}

impl TimeDecay {
    /// `decay_score` here is the display opacity, consistent with spec.md
    /// §4.9 ("Opacity: 1.0, 0.8, 0.6, 0.4, 0.2"); the missing-timestamp case
    /// falls back to a neutral 0.5 per spec.
    pub fn compute(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let Some(ts) = timestamp else {
            return Self {
                age_hours: None,
                category: DecayCategory::Unknown,
                decay_score: 0.5,
            };
        };

        let age_hours = (now - ts).num_milliseconds() as f64 / 3_600_000.0;
        let age_hours = age_hours.max(0.0);

        let category = if age_hours < 1.0 {
            DecayCategory::Fresh
        } else if age_hours < 6.0 {
            DecayCategory::Recent
        } else if age_hours < 24.0 {
            DecayCategory::Old
        } else if age_hours < 48.0 {
            DecayCategory::Stale
        } else {
            DecayCategory::VeryStale
        };

        Self {
            age_hours: Some(age_hours),
            decay_score: category.opacity(),
            category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn missing_timestamp_is_unknown() {
        let decay = TimeDecay::compute(None, Utc::now());
        assert_eq!(decay.age_hours, None);
        assert_eq!(decay.category, DecayCategory::Unknown);
        assert_eq!(decay.decay_score, 0.5);
    }

    #[test]
    fn fresh_event_has_full_opacity() {
        let now = Utc::now();
        let decay = TimeDecay::compute(Some(now - Duration::minutes(10)), now);
        assert_eq!(decay.category, DecayCategory::Fresh);
        assert_eq!(decay.decay_score, 1.0);
    }

    #[test]
    fn very_stale_event_has_lowest_opacity() {
        let now = Utc::now();
        let decay = TimeDecay::compute(Some(now - Duration::hours(72)), now);
        assert_eq!(decay.category, DecayCategory::VeryStale);
        assert_eq!(decay.decay_score, 0.2);
    }

    #[test]
    fn decay_is_monotonically_nonincreasing_with_age() {
        let now = Utc::now();
        let ages_hours = [0.1, 2.0, 12.0, 30.0, 60.0];
        let mut prev = f64::MAX;
        for h in ages_hours {
            let decay = TimeDecay::compute(Some(now - Duration::milliseconds((h * 3_600_000.0) as i64)), now);
            assert!(decay.decay_score <= prev);
            prev = decay.decay_score;
        }
    }
}
