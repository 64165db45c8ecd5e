//! Insight Routes
//!
//! Stateless glucose metrics over points supplied by the caller.
//!
//! - POST /api/v1/insights - Compute a report for a window of points
//! - POST /api/v1/insights/classify - Classify an existing insights record

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::{ClassifyResponse, InsightsRequest, InsightsResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::metrics::{classify_control, TimeWindow};
use crate::source::{parse_timestamp, InsightsBody, PointBatch};

/// POST /api/v1/insights
///
/// Malformed points are skipped and listed under `rejected`. An empty
/// window is not an error.
pub async fn compute_insights(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InsightsRequest>,
) -> ApiResult<Json<InsightsResponse>> {
    if req.points.len() > state.config.max_points {
        return Err(ApiError::Validation(format!(
            "at most {} points are accepted per request",
            state.config.max_points
        )));
    }

    let window = TimeWindow::new(
        parse_bound("start", req.start.as_deref())?,
        parse_bound("end", req.end.as_deref())?,
    );
    if let (Some(start), Some(end)) = (window.start, window.end) {
        if start > end {
            return Err(ApiError::Validation("start must not be after end".to_string()));
        }
    }

    let engine = state.engine_for(req.lower_bound, req.upper_bound)?;
    let batch = PointBatch::from_points(&req.points);
    let report = engine.report(&batch.readings, window);

    Ok(Json(InsightsResponse::new(report, batch.rejected)))
}

/// POST /api/v1/insights/classify
///
/// Accepts the insights record enveloped or flat, exactly as the CGM API
/// returns it.
pub async fn classify(
    State(state): State<Arc<AppState>>,
    Json(body): Json<InsightsBody>,
) -> ApiResult<Json<ClassifyResponse>> {
    let insights = body.into_dto().to_insights()?;
    let status = classify_control(&insights);
    let flags = state.engine.derive_risk_flags(&insights);

    Ok(Json(ClassifyResponse::new(&insights, status, &flags)))
}

fn parse_bound(
    name: &str,
    value: Option<&str>,
) -> ApiResult<Option<chrono::DateTime<chrono::Utc>>> {
    match value {
        None => Ok(None),
        Some(s) => parse_timestamp(s)
            .map(Some)
            .ok_or_else(|| ApiError::Validation(format!("invalid {} timestamp: {}", name, s))),
    }
}
