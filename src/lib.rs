//! CTV Tracking
//!
//! Ingestion of ad tracking events (impressions, quartiles, clicks,
//! interactions) for a connected-TV ad platform. Events are buffered in
//! memory and persisted in batches, each batch committing its raw rows and
//! the per-ad aggregate counters atomically.
//!
//! # Features
//!
//! - **Batched writes**: flush on size, on a debounce timer and on a
//!   safety-net interval
//! - **At-least-once**: a failed batch goes back to the head of the queue
//! - **Pluggable store**: in-memory or an fsynced JSONL journal
//! - **HTTP API**: JSON submission, VAST pixel beacons, metrics queries
//!
//! # Modules
//!
//! - `types`: Events, aggregate metrics, reports
//! - `validation`: Event type, ad id and metadata checks
//! - `pipeline`: Queue, flush scheduler and batch processor
//! - `store`: Transactional persistence boundary and its implementations
//! - `service`: Submission and query entry point
//! - `api`: Axum router and handlers
//! - `config`: Tunables and environment loading
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ctv_tracking::{EventData, MemoryStore, TrackingConfig, TrackingService};
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = TrackingService::new(Arc::new(MemoryStore::new()), TrackingConfig::default());
//!     service.start();
//!
//!     service.submit("impression", "ad-42", EventData::default()).await.unwrap();
//!     service.shutdown().await;
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

// Re-export commonly used items at crate root
pub use config::{ServerConfig, StoreKind, TrackingConfig};
pub use error::{ConfigError, StoreError, TrackingError, ValidationError};
pub use pipeline::{FlushOutcome, FlushTrigger, PipelineStats};
pub use service::TrackingService;
pub use store::{FileStore, FileStoreConfig, MemoryStore, TrackingStore};
pub use types::{
    AggregateMetric, EventData, EventKind, GroupedCount, MetricsReport, Period, StoredEvent,
    SubmitReceipt, TrackingEvent,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
