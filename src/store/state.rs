//! In-memory table state shared by both store implementations
//!
//! Commits are two-phase: `stage` validates a transaction against the current
//! state without touching it, `apply` installs a staged result. A failed stage
//! leaves the state exactly as it was.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::transaction::{CommitSummary, Transaction, WriteOp};
use crate::error::{StoreError, StoreResult};
use crate::types::{AggregateMetric, StoredEvent};

#[derive(Debug, Default)]
pub(crate) struct StoreState {
    events: Vec<StoredEvent>,
    /// Positions in `events` per ad id
    by_ad: HashMap<String, Vec<usize>>,
    metrics: HashMap<String, AggregateMetric>,
    next_id: u64,
}

/// Result of validating a transaction, ready to be applied
#[derive(Debug)]
pub(crate) struct Staged {
    events: Vec<StoredEvent>,
    metrics: HashMap<String, AggregateMetric>,
    summary: CommitSummary,
}

impl StoreState {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    pub fn stage(&self, tx: &Transaction, now: DateTime<Utc>) -> StoreResult<Staged> {
        let mut events = Vec::with_capacity(tx.row_count());
        let mut metrics: HashMap<String, AggregateMetric> = HashMap::new();
        let mut summary = CommitSummary::default();

        for op in tx.ops() {
            match op {
                WriteOp::CreateMany { rows } => {
                    for row in rows {
                        events.push(StoredEvent {
                            id: self.next_id + events.len() as u64,
                            event: row.clone(),
                            persisted_at: now,
                        });
                    }
                    summary.rows_created += rows.len();
                }
                WriteOp::Upsert {
                    ad_id,
                    create,
                    increment,
                } => {
                    let existing = metrics
                        .get(ad_id)
                        .or_else(|| self.metrics.get(ad_id))
                        .cloned();

                    let row = match existing {
                        Some(mut row) => {
                            for (counter, by) in increment {
                                let current = row.counters.entry(counter.clone()).or_insert(0);
                                *current = current.checked_add(*by).ok_or_else(|| {
                                    StoreError::CounterOverflow {
                                        ad_id: ad_id.clone(),
                                        counter: counter.clone(),
                                    }
                                })?;
                            }
                            row.updated_at = now;
                            summary.metrics_updated += 1;
                            row
                        }
                        None => {
                            summary.metrics_created += 1;
                            AggregateMetric::new(ad_id.clone(), create.clone(), now)
                        }
                    };
                    metrics.insert(ad_id.clone(), row);
                }
            }
        }

        Ok(Staged {
            events,
            metrics,
            summary,
        })
    }

    pub fn apply(&mut self, staged: Staged) -> CommitSummary {
        for event in staged.events {
            self.next_id = event.id + 1;
            self.by_ad
                .entry(event.event.ad_id.clone())
                .or_default()
                .push(self.events.len());
            self.events.push(event);
        }
        self.metrics.extend(staged.metrics);
        staged.summary
    }

    pub fn metric(&self, ad_id: &str) -> Option<AggregateMetric> {
        self.metrics.get(ad_id).cloned()
    }

    pub fn events_for_ad(&self, ad_id: &str, since: DateTime<Utc>, limit: usize) -> Vec<StoredEvent> {
        let Some(positions) = self.by_ad.get(ad_id) else {
            return Vec::new();
        };

        let mut events: Vec<StoredEvent> = positions
            .iter()
            .map(|&i| &self.events[i])
            .filter(|e| e.event.timestamp >= since)
            .cloned()
            .collect();

        // Newest first; ties keep the later insert first
        events.sort_by(|a, b| {
            b.event
                .timestamp
                .cmp(&a.event.timestamp)
                .then_with(|| b.id.cmp(&a.id))
        });
        events.truncate(limit);
        events
    }

    pub fn events_since(&self, since: DateTime<Utc>) -> Vec<StoredEvent> {
        self.events
            .iter()
            .filter(|e| e.event.timestamp >= since)
            .cloned()
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }
}
