//! Flush scheduler
//!
//! Decides when the queue is flushed and what happens when a flush fails.
//!
//! Triggers:
//! - size: the submission that brings the queue to `batch_size` flushes
//!   before it returns
//! - debounce: every other submission re-arms a single-shot timer
//! - safety net: a fixed-rate ticker, independent of submissions
//! - shutdown: timers are cancelled and one final flush runs
//!
//! Every flush runs in its own task. Dropping the future returned by
//! `flush`, or aborting the timer that started it, never interrupts a
//! drain/commit/requeue cycle half way.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant as StdInstant;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::processor::BatchProcessor;
use super::queue::EventQueue;
use super::stats::FlushStats;
use crate::config::TrackingConfig;

/// What caused a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushTrigger {
    Size,
    Debounce,
    Interval,
    Shutdown,
    Manual,
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlushTrigger::Size => write!(f, "size"),
            FlushTrigger::Debounce => write!(f, "debounce"),
            FlushTrigger::Interval => write!(f, "interval"),
            FlushTrigger::Shutdown => write!(f, "shutdown"),
            FlushTrigger::Manual => write!(f, "manual"),
        }
    }
}

/// Result of one flush cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FlushOutcome {
    /// Nothing was queued
    Empty,
    /// Every drained event was persisted
    Flushed { events: usize, batches: usize },
    /// A batch failed; all drained events went back on the queue
    Requeued {
        events: usize,
        /// Batches committed before the failure (their events may be
        /// persisted again on retry)
        committed_batches: usize,
        error: String,
    },
}

impl FlushOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, FlushOutcome::Requeued { .. })
    }
}

/// Owns flush timing and the requeue-on-failure policy
pub struct FlushScheduler {
    config: TrackingConfig,
    queue: Arc<EventQueue>,
    processor: BatchProcessor,
    /// Serialises flush cycles
    flush_lock: AsyncMutex<()>,
    /// The single pending debounce timer
    debounce: Mutex<Option<JoinHandle<()>>>,
    safety_net: Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
    closed: AtomicBool,
    stats: Mutex<FlushStats>,
}

impl FlushScheduler {
    pub fn new(config: TrackingConfig, queue: Arc<EventQueue>, processor: BatchProcessor) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            queue,
            processor,
            flush_lock: AsyncMutex::new(()),
            debounce: Mutex::new(None),
            safety_net: Mutex::new(None),
            shutdown_tx,
            closed: AtomicBool::new(false),
            stats: Mutex::new(FlushStats::default()),
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Whether `shutdown` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> FlushStats {
        self.stats.lock().clone()
    }

    /// Whether a debounce timer is currently waiting
    pub fn has_pending_timer(&self) -> bool {
        self.debounce
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Start the safety-net ticker
    ///
    /// Fires every `flush_interval`, first tick one interval from now. Calling
    /// this twice replaces the previous ticker.
    pub fn start(self: &Arc<Self>) {
        if self.is_closed() {
            return;
        }

        let period = self.config.flush_interval;
        let weak: Weak<Self> = Arc::downgrade(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(scheduler) = weak.upgrade() else {
                            break;
                        };
                        scheduler.flush(FlushTrigger::Interval).await;
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            debug!("Safety-net flush ticker stopped");
        });

        if let Some(previous) = self.safety_net.lock().replace(handle) {
            previous.abort();
        }
        info!(
            batch_size = self.config.batch_size,
            flush_interval_ms = period.as_millis() as u64,
            "Flush scheduler started"
        );
    }

    /// React to a submission that left the queue at `depth`
    pub async fn on_submit(self: &Arc<Self>, depth: usize) {
        if depth >= self.config.batch_size {
            self.flush(FlushTrigger::Size).await;
        } else {
            self.arm_debounce();
        }
    }

    /// (Re)arm the debounce timer, cancelling any pending one
    fn arm_debounce(self: &Arc<Self>) {
        if self.is_closed() {
            return;
        }

        let delay = self.config.flush_interval;
        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            if let Some(scheduler) = weak.upgrade() {
                scheduler.flush(FlushTrigger::Debounce).await;
            }
        });

        if let Some(previous) = self.debounce.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Run one flush cycle to completion
    pub async fn flush(self: &Arc<Self>, trigger: FlushTrigger) -> FlushOutcome {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move { scheduler.run_flush(trigger).await })
            .await
            .unwrap_or_else(|e| std::panic::resume_unwind(e.into_panic()))
    }

    async fn run_flush(&self, trigger: FlushTrigger) -> FlushOutcome {
        let _guard = self.flush_lock.lock().await;

        let drained = self.queue.drain();
        if drained.is_empty() {
            return FlushOutcome::Empty;
        }

        let started = StdInstant::now();
        let total = drained.len();
        let mut committed_batches = 0usize;
        let mut failure = None;

        for (index, batch) in drained.chunks(self.config.batch_size).enumerate() {
            match self.processor.process(batch).await {
                Ok(summary) => {
                    committed_batches += 1;
                    self.stats.lock().record_batch(batch.len());
                    debug!(
                        %trigger,
                        batch = index + 1,
                        rows = summary.rows_created,
                        metrics_created = summary.metrics_created,
                        metrics_updated = summary.metrics_updated,
                        "Committed tracking batch"
                    );
                }
                Err(e) => {
                    error!(%trigger, batch = index + 1, error = %e, "Tracking batch failed");
                    failure = Some(e.to_string());
                    break;
                }
            }
        }

        if let Some(error) = failure {
            self.queue.requeue(drained);
            self.stats.lock().record_failure(total, error.clone());
            warn!(
                %trigger,
                events = total,
                committed_batches,
                "Flush abandoned, drained events requeued"
            );
            return FlushOutcome::Requeued {
                events: total,
                committed_batches,
                error,
            };
        }

        self.stats.lock().record_success(Utc::now());
        info!(
            %trigger,
            events = total,
            batches = committed_batches,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Flushed tracking events"
        );
        FlushOutcome::Flushed {
            events: total,
            batches: committed_batches,
        }
    }

    /// Stop all timers and flush whatever is still queued
    ///
    /// After this returns no timer will fire again. Events that fail to
    /// persist here stay in the queue and are lost when the process exits.
    pub async fn shutdown(self: &Arc<Self>) -> FlushOutcome {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(true);

        if let Some(handle) = self.debounce.lock().take() {
            handle.abort();
        }
        if let Some(handle) = self.safety_net.lock().take() {
            handle.abort();
        }

        let outcome = self.flush(FlushTrigger::Shutdown).await;
        match &outcome {
            FlushOutcome::Requeued { events, error, .. } => {
                error!(events, %error, "Final flush failed, queued events will be lost");
            }
            _ => info!("Flush scheduler stopped"),
        }
        outcome
    }
}
