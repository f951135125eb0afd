//! Data types for the tracking pipeline
//!
//! This module contains the data structures shared by the queue, the store
//! and the HTTP layer.

mod event;
mod metric;
mod period;
mod report;

pub use event::{EventData, EventKind, StoredEvent, TrackingEvent};
pub use metric::{AggregateMetric, GroupedCount};
pub use period::Period;
pub use report::{MetricsReport, SubmitReceipt};
