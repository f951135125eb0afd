//! Aggregate metric row, one per ad

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cumulative per-ad counters keyed by counter name
/// (`impressions`, `clicks`, ... or a custom event tag)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateMetric {
    pub ad_id: String,
    pub counters: BTreeMap<String, u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AggregateMetric {
    /// Create a fresh row seeded with the given counts
    pub fn new(ad_id: String, counters: BTreeMap<String, u64>, now: DateTime<Utc>) -> Self {
        Self {
            ad_id,
            counters,
            created_at: now,
            updated_at: now,
        }
    }

    /// Current value of a counter, zero when it was never incremented
    pub fn count(&self, counter: &str) -> u64 {
        self.counters.get(counter).copied().unwrap_or(0)
    }

    /// Sum of all counters
    pub fn total(&self) -> u64 {
        self.counters.values().sum()
    }
}

/// A `(type, adId)` group with its event count inside a period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedCount {
    #[serde(rename = "type")]
    pub event_type: String,
    pub ad_id: String,
    pub count: u64,
}
