//! Flush statistics
//!
//! Counters describing what the scheduler has done since startup:
//! - Flushes attempted, succeeded and abandoned
//! - Events and batches persisted
//! - Last flush time and last failure

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Statistics about flush activity
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushStats {
    /// Flushes that persisted every drained event
    pub flushes: u64,
    /// Flushes abandoned after a batch failure
    pub failed_flushes: u64,
    /// Batches committed, including those of later-failed flushes
    pub batches_committed: u64,
    /// Events persisted, including those of later-failed flushes
    pub events_persisted: u64,
    /// Events put back on the queue after failures
    pub events_requeued: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_flush_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl FlushStats {
    pub(crate) fn record_batch(&mut self, events: usize) {
        self.batches_committed += 1;
        self.events_persisted += events as u64;
    }

    pub(crate) fn record_success(&mut self, at: DateTime<Utc>) {
        self.flushes += 1;
        self.last_flush_at = Some(at);
    }

    pub(crate) fn record_failure(&mut self, requeued: usize, error: String) {
        self.failed_flushes += 1;
        self.events_requeued += requeued as u64;
        self.last_error = Some(error);
    }

    /// Number of flush attempts that drained something
    pub fn attempts(&self) -> u64 {
        self.flushes + self.failed_flushes
    }
}

/// Snapshot of queue and flush state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub queue_depth: usize,
    pub batch_size: usize,
    pub flush_interval_ms: u64,
    #[serde(flatten)]
    pub flush: FlushStats,
}
