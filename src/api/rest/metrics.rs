//! Metrics endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{ApiError, ApiResponse};
use crate::api::state::AppState;
use crate::types::{GroupedCount, MetricsReport, Period};

/// Query parameters for aggregated metrics
#[derive(Debug, Deserialize)]
pub struct AggregatedParams {
    /// hour, day, week or month (default: day)
    pub period: Option<String>,
}

/// GET /api/tracking/metrics/:ad_id - Aggregate row, recent events, queued count
pub async fn get_ad_metrics(
    State(state): State<Arc<AppState>>,
    Path(ad_id): Path<String>,
) -> Result<Json<ApiResponse<MetricsReport>>, ApiError> {
    let report = state.service.get_metrics(&ad_id).await?;

    if report.is_empty() {
        return Err(ApiError::not_found(format!(
            "No tracking data for ad '{}'",
            ad_id
        )));
    }

    Ok(Json(ApiResponse::new(report)))
}

/// GET /api/tracking/metrics?period= - Counts per (type, adId) within a period
pub async fn get_aggregated_metrics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AggregatedParams>,
) -> Result<Json<ApiResponse<Vec<GroupedCount>>>, ApiError> {
    let period = match params.period.as_deref() {
        Some(name) => name.parse::<Period>()?,
        None => Period::default(),
    };

    let groups = state.service.get_aggregated_metrics(period).await?;
    let total = groups.len();
    Ok(Json(ApiResponse::with_total(groups, total)))
}
