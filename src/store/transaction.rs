//! Write sets committed by `TrackingStore::transaction`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::TrackingEvent;

/// A single write inside a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WriteOp {
    /// Insert raw event rows verbatim
    CreateMany { rows: Vec<TrackingEvent> },

    /// Create the ad's aggregate row with `create` if it does not exist,
    /// otherwise add `increment` to the named counters
    Upsert {
        ad_id: String,
        create: BTreeMap<String, u64>,
        increment: BTreeMap<String, u64>,
    },
}

/// Ordered write set
///
/// Operations are applied in order, so an upsert sees the effect of an
/// earlier upsert on the same ad inside the same transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    ops: Vec<WriteOp>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a bulk insert of raw events
    pub fn create_many(&mut self, rows: Vec<TrackingEvent>) -> &mut Self {
        if !rows.is_empty() {
            self.ops.push(WriteOp::CreateMany { rows });
        }
        self
    }

    /// Queue an upsert of an aggregate row
    pub fn upsert(
        &mut self,
        ad_id: impl Into<String>,
        create: BTreeMap<String, u64>,
        increment: BTreeMap<String, u64>,
    ) -> &mut Self {
        self.ops.push(WriteOp::Upsert {
            ad_id: ad_id.into(),
            create,
            increment,
        });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of raw rows this transaction inserts
    pub fn row_count(&self) -> usize {
        self.ops
            .iter()
            .map(|op| match op {
                WriteOp::CreateMany { rows } => rows.len(),
                WriteOp::Upsert { .. } => 0,
            })
            .sum()
    }
}

/// What a committed transaction changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub rows_created: usize,
    pub metrics_created: usize,
    pub metrics_updated: usize,
}
