//! Query responses

use serde::Serialize;

use super::{AggregateMetric, StoredEvent};

/// Per-ad view merging durable and in-flight state
///
/// Not transactionally consistent: the queue count and the durable row are
/// read separately, so a flush completing in between can be seen twice or
/// not at all.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub metrics: Option<AggregateMetric>,
    pub recent_events: Vec<StoredEvent>,
    pub queued_events: usize,
}

impl MetricsReport {
    /// True when neither the store nor the queue knows anything about the ad
    pub fn is_empty(&self) -> bool {
        self.metrics.is_none() && self.recent_events.is_empty() && self.queued_events == 0
    }
}

/// Result of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub accepted: bool,
    pub queue_depth: usize,
}
