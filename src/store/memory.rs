//! Process-memory store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::state::StoreState;
use super::transaction::{CommitSummary, Transaction};
use super::TrackingStore;
use crate::error::StoreResult;
use crate::types::{AggregateMetric, StoredEvent};

/// Store that keeps raw events and aggregates in memory
///
/// Commits stage and install under a single write lock, so readers never see
/// half of a transaction.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::new()),
        }
    }

    /// Total number of raw event rows
    pub fn event_count(&self) -> usize {
        self.state.read().event_count()
    }

    /// Number of ads with an aggregate row
    pub fn metric_count(&self) -> usize {
        self.state.read().metric_count()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackingStore for MemoryStore {
    async fn transaction(&self, tx: Transaction) -> StoreResult<CommitSummary> {
        let mut state = self.state.write();
        let staged = state.stage(&tx, Utc::now())?;
        Ok(state.apply(staged))
    }

    async fn get_metric(&self, ad_id: &str) -> StoreResult<Option<AggregateMetric>> {
        Ok(self.state.read().metric(ad_id))
    }

    async fn events_for_ad(
        &self,
        ad_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<StoredEvent>> {
        Ok(self.state.read().events_for_ad(ad_id, since, limit))
    }

    async fn events_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<StoredEvent>> {
        Ok(self.state.read().events_since(since))
    }
}
