//! HTTP API tests, driven through the router with `oneshot`

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use ctv_tracking::api::{create_router, AppState};
use ctv_tracking::{FileStore, FileStoreConfig, MemoryStore, TrackingConfig, TrackingService};

fn memory_app(batch_size: usize) -> (Router, Arc<TrackingService>) {
    let service = Arc::new(TrackingService::new(
        Arc::new(MemoryStore::new()),
        TrackingConfig::new(batch_size, Duration::from_secs(60)),
    ));
    let app = create_router(Arc::new(AppState::new(service.clone())));
    (app, service)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_submit_event_accepted() {
    let (app, service) = memory_app(100);

    let response = app
        .oneshot(post_json(
            "/api/tracking/events",
            json!({"type": "impression", "adId": "ad-1", "metadata": {"slot": "preroll"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["accepted"], true);
    assert_eq!(body["queueDepth"], 1);
    assert_eq!(service.queue_depth(), 1);
}

#[tokio::test]
async fn test_submit_invalid_event_rejected() {
    let (app, service) = memory_app(100);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/tracking/events",
            json!({"type": "", "adId": "ad-1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/tracking/events",
            json!({"type": "click", "adId": "ad-1", "metadata": "not-an-object"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Missing adId fails JSON extraction
    let response = app
        .oneshot(post_json("/api/tracking/events", json!({"type": "click"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(service.queue_depth(), 0);
}

#[tokio::test]
async fn test_pixel_records_query_as_metadata() {
    let (app, service) = memory_app(100);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/tracking/pixel/ad-9/firstQuartile?cb=12345")
                .header("user-agent", "RokuOS/11")
                .header("x-forwarded-for", "203.0.113.5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    service.flush().await;

    let response = app.oneshot(get("/api/tracking/metrics/ad-9")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["metrics"]["counters"]["firstQuartiles"], 1);

    let event = &body["data"]["recentEvents"][0];
    assert_eq!(event["type"], "firstQuartile");
    assert_eq!(event["userAgent"], "RokuOS/11");
    assert_eq!(event["ipAddress"], "203.0.113.5");
    assert_eq!(event["metadata"]["cb"], "12345");
}

#[tokio::test]
async fn test_unknown_ad_is_not_found() {
    let (app, _service) = memory_app(100);

    let response = app.oneshot(get("/api/tracking/metrics/nobody")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_queued_only_ad_is_reported() {
    let (app, _service) = memory_app(100);

    app.clone()
        .oneshot(post_json(
            "/api/tracking/events",
            json!({"type": "start", "adId": "ad-2"}),
        ))
        .await
        .unwrap();

    let response = app.oneshot(get("/api/tracking/metrics/ad-2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["data"]["metrics"].is_null());
    assert_eq!(body["data"]["queuedEvents"], 1);
}

#[tokio::test]
async fn test_aggregated_metrics_and_period_validation() {
    let (app, service) = memory_app(100);

    for (kind, ad) in [("click", "a"), ("click", "a"), ("impression", "b")] {
        app.clone()
            .oneshot(post_json(
                "/api/tracking/events",
                json!({"type": kind, "adId": ad}),
            ))
            .await
            .unwrap();
    }
    service.flush().await;

    let response = app
        .clone()
        .oneshot(get("/api/tracking/metrics?period=week"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["data"][0]["type"], "click");
    assert_eq!(body["data"][0]["adId"], "a");
    assert_eq!(body["data"][0]["count"], 2);

    let response = app
        .oneshot(get("/api/tracking/metrics?period=decade"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_flush_and_stats_endpoints() {
    let (app, _service) = memory_app(100);

    app.clone()
        .oneshot(post_json(
            "/api/tracking/events",
            json!({"type": "skip", "adId": "ad-3"}),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/tracking/flush")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "flushed");
    assert_eq!(body["data"]["events"], 1);

    let response = app.oneshot(get("/api/tracking/stats")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["queueDepth"], 0);
    assert_eq!(body["data"]["batchSize"], 100);
    assert_eq!(body["data"]["flushes"], 1);
    assert_eq!(body["data"]["eventsPersisted"], 1);
}

#[tokio::test]
async fn test_submission_refused_after_shutdown() {
    let (app, service) = memory_app(100);
    service.shutdown().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/tracking/events",
            json!({"type": "impression", "adId": "ad-4"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["accepted"], false);

    let response = app
        .oneshot(get("/api/tracking/pixel/ad-4/impression"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_file_backed_api() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::open(FileStoreConfig::new(dir.path())).unwrap());
    let service = Arc::new(TrackingService::new(
        store,
        TrackingConfig::new(2, Duration::from_secs(60)),
    ));
    let app = create_router(Arc::new(AppState::new(service.clone())));

    for kind in ["impression", "mute"] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/tracking/events",
                json!({"type": kind, "adId": "ad-5"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    // Second submission reached batch_size and flushed inline
    assert_eq!(service.queue_depth(), 0);
    assert!(dir.path().join("tracking.jsonl").exists());

    let response = app.oneshot(get("/api/tracking/metrics/ad-5")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["metrics"]["counters"]["impressions"], 1);
    assert_eq!(body["data"]["metrics"]["counters"]["mutes"], 1);
    assert_eq!(body["data"]["recentEvents"].as_array().unwrap().len(), 2);
}
