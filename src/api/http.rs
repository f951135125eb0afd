//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use super::rest::{metrics, tracking};
use super::state::AppState;

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // Beacons come from players on arbitrary origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Submission
        .route("/api/tracking/events", post(tracking::track_event))
        .route(
            "/api/tracking/pixel/:ad_id/:event_type",
            get(tracking::track_pixel),
        )
        // Queries
        .route("/api/tracking/metrics", get(metrics::get_aggregated_metrics))
        .route("/api/tracking/metrics/:ad_id", get(metrics::get_ad_metrics))
        // Operations
        .route("/api/tracking/flush", post(tracking::flush))
        .route("/api/tracking/stats", get(tracking::stats))
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use crate::config::TrackingConfig;
    use crate::service::TrackingService;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_health_check() {
        let service = TrackingService::new(
            Arc::new(MemoryStore::new()),
            TrackingConfig::new(100, Duration::from_secs(60)),
        );
        let state = Arc::new(AppState::new(Arc::new(service)));
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
    }
}
