//! Batch processor: one batch, one store transaction

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::StoreResult;
use crate::store::{CommitSummary, TrackingStore, Transaction};
use crate::types::TrackingEvent;

/// Persists batches of raw events and their aggregate increments
#[derive(Clone)]
pub struct BatchProcessor {
    store: Arc<dyn TrackingStore>,
}

impl BatchProcessor {
    pub fn new(store: Arc<dyn TrackingStore>) -> Self {
        Self { store }
    }

    /// Build the write set for a batch
    ///
    /// Raw events are inserted verbatim, then each ad gets one upsert carrying
    /// the per-counter occurrence counts of this batch, both as the initial
    /// values and as the increments.
    pub fn build_transaction(batch: &[TrackingEvent]) -> Transaction {
        let mut per_ad: BTreeMap<&str, BTreeMap<String, u64>> = BTreeMap::new();
        for event in batch {
            *per_ad
                .entry(event.ad_id.as_str())
                .or_default()
                .entry(event.kind.counter_name().to_string())
                .or_insert(0) += 1;
        }

        let mut tx = Transaction::new();
        tx.create_many(batch.to_vec());
        for (ad_id, counts) in per_ad {
            tx.upsert(ad_id, counts.clone(), counts);
        }
        tx
    }

    /// Persist one batch atomically
    pub async fn process(&self, batch: &[TrackingEvent]) -> StoreResult<CommitSummary> {
        self.store.transaction(Self::build_transaction(batch)).await
    }
}
