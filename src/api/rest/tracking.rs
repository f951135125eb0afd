//! Submission endpoints

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{ApiError, ApiResponse};
use crate::api::state::AppState;
use crate::types::{EventData, SubmitReceipt};

/// Body of `POST /api/tracking/events`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEventRequest {
    #[serde(rename = "type")]
    pub event_type: String,
    pub ad_id: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Client-side occurrence time, defaults to arrival
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Query parameters accepted by the pixel endpoint
///
/// Every parameter ends up in the event metadata (cache busters, macros
/// expanded by the player).
pub type PixelParams = std::collections::BTreeMap<String, String>;

/// Client IP: first `X-Forwarded-For` hop, else `X-Real-IP`, else the peer
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn receipt_response(receipt: SubmitReceipt, accepted_status: StatusCode) -> Response {
    if receipt.accepted {
        (accepted_status, Json(receipt)).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(receipt)).into_response()
    }
}

/// POST /api/tracking/events - Queue a tracking event
///
/// Answers `202 Accepted` once the event is queued; persistence happens on
/// the next flush.
pub async fn track_event(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<TrackEventRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let data = EventData {
        user_agent: user_agent(&headers),
        ip_address: client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr)),
        timestamp: request.timestamp,
        metadata: request.metadata,
    };

    let receipt = state
        .service
        .submit(&request.event_type, &request.ad_id, data)
        .await?;

    Ok(receipt_response(receipt, StatusCode::ACCEPTED))
}

/// GET /api/tracking/pixel/:ad_id/:event_type - VAST beacon
///
/// Players fire these as plain GETs and ignore the body, so the answer is
/// `204 No Content`.
pub async fn track_pixel(
    State(state): State<Arc<AppState>>,
    Path((ad_id, event_type)): Path<(String, String)>,
    Query(params): Query<PixelParams>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let metadata = serde_json::to_value(params).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let data = EventData {
        user_agent: user_agent(&headers),
        ip_address: client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr)),
        timestamp: None,
        metadata,
    };

    let receipt = state.service.submit(&event_type, &ad_id, data).await?;
    if receipt.accepted {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Ok(StatusCode::SERVICE_UNAVAILABLE.into_response())
    }
}

/// POST /api/tracking/flush - Flush the queue now
pub async fn flush(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let outcome = state.service.flush().await;
    let status = if outcome.is_failure() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(ApiResponse::new(outcome)))
}

/// GET /api/tracking/stats - Queue depth and flush counters
pub async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::new(state.service.stats()))
}
