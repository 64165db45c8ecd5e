//! Recommendation Routes
//!
//! - POST /api/v1/recommend - Short-term trend assessment

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::{RecommendRequest, RecommendResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::source::PointBatch;

/// Largest lookback a caller may request
const MAX_LOOKBACK: usize = 288;

/// POST /api/v1/recommend
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecommendRequest>,
) -> ApiResult<Json<RecommendResponse>> {
    if req.points.is_empty() {
        return Err(ApiError::Validation("no points provided".to_string()));
    }

    let lookback = req.lookback.unwrap_or(state.trend_lookback);
    if lookback == 0 || lookback > MAX_LOOKBACK {
        return Err(ApiError::Validation(format!(
            "lookback must be between 1 and {}",
            MAX_LOOKBACK
        )));
    }

    let batch = PointBatch::from_points(&req.points);
    if batch.readings.is_empty() {
        return Err(ApiError::Validation("no valid points provided".to_string()));
    }

    let assessment = state.engine.trend(&batch.readings, lookback);
    tracing::debug!(risk = ?assessment.risk, slope = assessment.slope, "Assessed trend");

    Ok(Json(RecommendResponse {
        assessment,
        lookback,
        rejected: batch.rejected,
    }))
}
