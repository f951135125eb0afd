//! Durable store boundary
//!
//! The pipeline only needs three write primitives from its store:
//! `create_many`, `upsert` and an atomic `transaction` wrapping them. They are
//! modelled as a `Transaction` write set that the store commits all-or-nothing.
//!
//! # Implementations
//!
//! - `MemoryStore`: process memory, for tests and ephemeral deployments
//! - `FileStore`: append-only JSONL journal, one line per committed transaction
//!
//! ```text
//! BatchProcessor                     TrackingStore
//! ┌───────────────────────┐          ┌──────────────────────────────┐
//! │ tx.create_many(batch) │          │ stage (validate, no mutation)│
//! │ tx.upsert(ad, counts) │────────► │ persist (journal + fsync)    │
//! │ store.transaction(tx) │          │ apply to in-memory state     │
//! └───────────────────────┘          └──────────────────────────────┘
//! ```

mod file;
mod memory;
mod state;
mod transaction;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::types::{AggregateMetric, GroupedCount, StoredEvent};

pub use file::{FileStore, FileStoreConfig};
pub use memory::MemoryStore;
pub use transaction::{CommitSummary, Transaction, WriteOp};

/// Store consumed by the batch processor and the query API
#[async_trait]
pub trait TrackingStore: Send + Sync + 'static {
    /// Commit a write set atomically: every operation lands or none does
    async fn transaction(&self, tx: Transaction) -> StoreResult<CommitSummary>;

    /// Aggregate row for one ad
    async fn get_metric(&self, ad_id: &str) -> StoreResult<Option<AggregateMetric>>;

    /// Raw events for one ad with `timestamp >= since`, newest first
    async fn events_for_ad(
        &self,
        ad_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<StoredEvent>>;

    /// All raw events with `timestamp >= since`, in insertion order
    async fn events_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<StoredEvent>>;

    /// Raw events with `timestamp >= since` grouped by `(type, adId)`
    ///
    /// Ordered by count descending, then type, then ad id.
    async fn group_counts(&self, since: DateTime<Utc>) -> StoreResult<Vec<GroupedCount>> {
        let events = self.events_since(since).await?;
        Ok(group_events(&events))
    }
}

pub(crate) fn group_events(events: &[StoredEvent]) -> Vec<GroupedCount> {
    let mut groups: BTreeMap<(&str, &str), u64> = BTreeMap::new();
    for stored in events {
        *groups
            .entry((stored.event.kind.as_str(), stored.event.ad_id.as_str()))
            .or_insert(0) += 1;
    }

    let mut counts: Vec<GroupedCount> = groups
        .into_iter()
        .map(|((event_type, ad_id), count)| GroupedCount {
            event_type: event_type.to_string(),
            ad_id: ad_id.to_string(),
            count,
        })
        .collect();

    // BTreeMap already yields (type, adId) order, a stable sort keeps it
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}
