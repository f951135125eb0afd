//! Tracking service - process-wide entry point
//!
//! Ties the queue, the scheduler and the store together and exposes the
//! submission and query operations used by the HTTP layer.
//!
//! Lifecycle: construct with `new`, call `start` once inside the runtime to
//! arm the safety-net ticker, call `shutdown` on controlled termination to
//! cancel timers and flush what is left.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::config::TrackingConfig;
use crate::error::TrackingResult;
use crate::pipeline::{
    BatchProcessor, EventQueue, FlushOutcome, FlushScheduler, FlushTrigger, PipelineStats,
};
use crate::store::TrackingStore;
use crate::types::{
    EventData, EventKind, GroupedCount, MetricsReport, Period, SubmitReceipt, TrackingEvent,
};
use crate::validation::{validate_ad_id, validate_metadata};

pub struct TrackingService {
    config: TrackingConfig,
    queue: Arc<EventQueue>,
    scheduler: Arc<FlushScheduler>,
    store: Arc<dyn TrackingStore>,
}

impl TrackingService {
    /// Create a service on top of a store
    ///
    /// No timer runs until `start` is called.
    pub fn new(store: Arc<dyn TrackingStore>, config: TrackingConfig) -> Self {
        let queue = Arc::new(EventQueue::new());
        let scheduler = Arc::new(FlushScheduler::new(
            config.clone(),
            queue.clone(),
            BatchProcessor::new(store.clone()),
        ));

        Self {
            config,
            queue,
            scheduler,
            store,
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Arm the safety-net flush ticker. Must run inside a tokio runtime.
    pub fn start(&self) {
        self.scheduler.start();
    }

    /// Validate and queue a tracking event
    ///
    /// Malformed input is rejected before it reaches the queue. After
    /// `shutdown` the event is not queued and the receipt says so.
    pub async fn submit(
        &self,
        event_type: &str,
        ad_id: &str,
        data: EventData,
    ) -> TrackingResult<SubmitReceipt> {
        let kind: EventKind = event_type.parse()?;
        validate_ad_id(ad_id)?;
        validate_metadata(&data.metadata)?;

        let event = TrackingEvent::from_submission(kind, ad_id.to_string(), data, Utc::now());
        Ok(self.submit_event(event).await)
    }

    /// Queue an already-built event
    ///
    /// Reaching `batch_size` flushes before returning; anything shorter
    /// re-arms the debounce timer.
    pub async fn submit_event(&self, event: TrackingEvent) -> SubmitReceipt {
        if self.scheduler.is_closed() {
            debug!(ad_id = %event.ad_id, kind = %event.kind, "Dropping event submitted after shutdown");
            return SubmitReceipt {
                accepted: false,
                queue_depth: self.queue.len(),
            };
        }

        let depth = self.queue.push(event);
        self.scheduler.on_submit(depth).await;

        SubmitReceipt {
            accepted: true,
            queue_depth: self.queue.len(),
        }
    }

    /// Durable aggregate, recent raw events and in-flight count for one ad
    pub async fn get_metrics(&self, ad_id: &str) -> TrackingResult<MetricsReport> {
        let since = self.config.recent_since(Utc::now());

        let metrics = self.store.get_metric(ad_id).await?;
        let recent_events = self
            .store
            .events_for_ad(ad_id, since, self.config.recent_events_limit)
            .await?;
        let queued_events = self.queue.queued_for(ad_id);

        Ok(MetricsReport {
            metrics,
            recent_events,
            queued_events,
        })
    }

    /// Durable raw events of the trailing `period`, counted per `(type, adId)`
    pub async fn get_aggregated_metrics(&self, period: Period) -> TrackingResult<Vec<GroupedCount>> {
        let since = period.since(Utc::now());
        Ok(self.store.group_counts(since).await?)
    }

    /// Flush now, outside the regular triggers
    pub async fn flush(&self) -> FlushOutcome {
        self.scheduler.flush(FlushTrigger::Manual).await
    }

    /// Cancel timers and run the final flush
    pub async fn shutdown(&self) -> FlushOutcome {
        self.scheduler.shutdown().await
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            queue_depth: self.queue.len(),
            batch_size: self.config.batch_size,
            flush_interval_ms: self.config.flush_interval.as_millis() as u64,
            flush: self.scheduler.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;

    use crate::error::TrackingError;
    use crate::store::MemoryStore;

    fn service(batch_size: usize) -> (TrackingService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let config = TrackingConfig::new(batch_size, Duration::from_secs(60));
        (TrackingService::new(store.clone(), config), store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_returns_depth() {
        let (service, _store) = service(100);

        let receipt = service
            .submit("impression", "A", EventData::default())
            .await
            .unwrap();
        assert_eq!(receipt, SubmitReceipt { accepted: true, queue_depth: 1 });

        let receipt = service
            .submit("click", "A", EventData::with_metadata(json!({"x": 1})))
            .await
            .unwrap();
        assert_eq!(receipt.queue_depth, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_input_never_queued() {
        let (service, _store) = service(100);

        let err = service
            .submit("bad type", "A", EventData::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackingError::Validation(_)));

        assert!(service.submit("click", "", EventData::default()).await.is_err());
        assert!(service
            .submit("click", "A", EventData::with_metadata(json!([1])))
            .await
            .is_err());

        assert_eq!(service.queue_depth(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_size_trigger_flushes_inline() {
        let (service, store) = service(3);

        for _ in 0..2 {
            service.submit("start", "A", EventData::default()).await.unwrap();
        }
        assert_eq!(store.event_count(), 0);

        let receipt = service.submit("start", "A", EventData::default()).await.unwrap();
        assert_eq!(receipt.queue_depth, 0);
        assert_eq!(store.event_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_metrics_merges_queue_and_store() {
        let (service, _store) = service(100);

        service.submit("impression", "A", EventData::default()).await.unwrap();
        service.flush().await;
        service.submit("click", "A", EventData::default()).await.unwrap();
        service.submit("click", "B", EventData::default()).await.unwrap();

        let report = service.get_metrics("A").await.unwrap();
        assert_eq!(report.metrics.as_ref().unwrap().count("impressions"), 1);
        assert_eq!(report.metrics.as_ref().unwrap().count("clicks"), 0);
        assert_eq!(report.recent_events.len(), 1);
        assert_eq!(report.queued_events, 1);

        assert!(service.get_metrics("nobody").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recent_window_excludes_old_events() {
        let (service, _store) = service(100);

        let old = Utc::now() - chrono::Duration::days(3);
        service
            .submit(
                "impression",
                "A",
                EventData {
                    timestamp: Some(old),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        service.submit("impression", "A", EventData::default()).await.unwrap();
        service.flush().await;

        let report = service.get_metrics("A").await.unwrap();
        assert_eq!(report.metrics.unwrap().count("impressions"), 2);
        assert_eq!(report.recent_events.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_recent_window() {
        let mut config = TrackingConfig::new(100, Duration::from_secs(60));
        config.recent_window = Duration::from_secs(10_000_000_000_000);
        let service = TrackingService::new(Arc::new(MemoryStore::new()), config);

        let old = Utc::now() - chrono::Duration::days(400);
        service
            .submit(
                "impression",
                "A",
                EventData {
                    timestamp: Some(old),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        service.flush().await;

        let report = service.get_metrics("A").await.unwrap();
        assert_eq!(report.recent_events.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aggregated_metrics_by_period() {
        let (service, _store) = service(100);

        let two_days_ago = Utc::now() - chrono::Duration::days(2);
        service
            .submit(
                "click",
                "A",
                EventData {
                    timestamp: Some(two_days_ago),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        service.submit("click", "A", EventData::default()).await.unwrap();
        service.submit("impression", "B", EventData::default()).await.unwrap();
        service.flush().await;

        let day = service.get_aggregated_metrics(Period::Day).await.unwrap();
        assert_eq!(day.len(), 2);
        assert!(day.iter().all(|g| g.count == 1));

        let week = service.get_aggregated_metrics(Period::Week).await.unwrap();
        assert_eq!(week[0].event_type, "click");
        assert_eq!(week[0].ad_id, "A");
        assert_eq!(week[0].count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_after_shutdown_is_refused() {
        let (service, store) = service(100);
        service.start();

        service.submit("impression", "A", EventData::default()).await.unwrap();
        let outcome = service.shutdown().await;
        assert_eq!(outcome, FlushOutcome::Flushed { events: 1, batches: 1 });

        let receipt = service.submit("impression", "A", EventData::default()).await.unwrap();
        assert!(!receipt.accepted);
        assert_eq!(receipt.queue_depth, 0);
        assert_eq!(store.event_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats() {
        let (service, _store) = service(2);
        service.submit("impression", "A", EventData::default()).await.unwrap();
        service.submit("impression", "A", EventData::default()).await.unwrap();
        service.submit("impression", "A", EventData::default()).await.unwrap();

        let stats = service.stats();
        assert_eq!(stats.queue_depth, 1);
        assert_eq!(stats.batch_size, 2);
        assert_eq!(stats.flush.flushes, 1);
        assert_eq!(stats.flush.events_persisted, 2);
    }
}
