//! Tracking event batching pipeline
//!
//! - `EventQueue`: in-memory FIFO of submitted events
//! - `FlushScheduler`: size, debounce, safety-net and shutdown flushes
//! - `BatchProcessor`: one store transaction per batch
//! - `FlushStats`: counters describing flush activity
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//! ┌──────────┐    ┌────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │ submit() │───►│ EventQueue │───►│ FlushScheduler   │───►│ BatchProcessor  │
//! │          │    │ push       │    │ drain + chunk    │    │ tx per batch    │
//! └──────────┘    └────────────┘    └──────────────────┘    └─────────────────┘
//!                       ▲                    │ any batch failed
//!                       └──── requeue all ◄──┘
//! ```

mod processor;
mod queue;
mod scheduler;
mod stats;

pub use processor::BatchProcessor;
pub use queue::EventQueue;
pub use scheduler::{FlushOutcome, FlushScheduler, FlushTrigger};
pub use stats::{FlushStats, PipelineStats};
