//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::metrics::{
    ControlStatus, ExcursionCounts, GlucoseReading, InsightReport, Insights, RiskFlag,
    TargetRange, TimeWindow, TrendAssessment, Variability,
};
use crate::source::{InsightsDto, PointDto, RejectedPoint};

// ============================================
// INSIGHTS DTOs
// ============================================

/// Insights request: raw points plus an optional window and range
#[derive(Debug, Deserialize)]
pub struct InsightsRequest {
    /// Points in the same shape the CGM API returns them
    #[serde(default)]
    pub points: Vec<PointDto>,
    /// Inclusive window start (any accepted timestamp format)
    #[serde(default)]
    pub start: Option<String>,
    /// Inclusive window end
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub lower_bound: Option<f64>,
    #[serde(default)]
    pub upper_bound: Option<f64>,
}

/// A risk flag with its user-facing text
#[derive(Debug, Serialize)]
pub struct RiskFlagDto {
    pub flag: RiskFlag,
    pub title: String,
    pub advice: String,
}

impl From<RiskFlag> for RiskFlagDto {
    fn from(flag: RiskFlag) -> Self {
        Self {
            flag,
            title: flag.title().to_string(),
            advice: flag.advice().to_string(),
        }
    }
}

fn flag_dtos(flags: &BTreeSet<RiskFlag>) -> Vec<RiskFlagDto> {
    flags.iter().copied().map(RiskFlagDto::from).collect()
}

/// Insights response
#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    /// Insights in the CGM API's wire shape, rounded for display
    pub insights: InsightsDto,
    pub status: ControlStatus,
    pub status_message: String,
    pub flags: Vec<RiskFlagDto>,
    pub excursions: ExcursionCounts,
    pub variability: Variability,
    pub latest: Option<GlucoseReading>,
    pub target_range: TargetRange,
    pub window: TimeWindow,
    /// Points dropped before computation
    pub rejected: Vec<RejectedPoint>,
}

impl InsightsResponse {
    pub fn new(report: InsightReport, rejected: Vec<RejectedPoint>) -> Self {
        let mut insights = InsightsDto::from(&report.insights);
        insights.highs_count = Some(report.excursions.highs);
        insights.lows_count = Some(report.excursions.lows);

        Self {
            insights,
            status: report.status,
            status_message: report.status.message().to_string(),
            flags: flag_dtos(&report.flags),
            excursions: report.excursions,
            variability: report.variability,
            latest: report.latest,
            target_range: report.target_range,
            window: report.window,
            rejected,
        }
    }
}

/// Classification of a supplied insights record
#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub insights: InsightsDto,
    pub status: ControlStatus,
    pub status_message: String,
    pub flags: Vec<RiskFlagDto>,
}

impl ClassifyResponse {
    pub fn new(insights: &Insights, status: ControlStatus, flags: &BTreeSet<RiskFlag>) -> Self {
        Self {
            insights: InsightsDto::from(insights),
            status,
            status_message: status.message().to_string(),
            flags: flag_dtos(flags),
        }
    }
}

// ============================================
// RECOMMEND DTOs
// ============================================

/// Trend recommendation request
#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub points: Vec<PointDto>,
    /// Number of most recent readings to consider
    #[serde(default)]
    pub lookback: Option<usize>,
}

/// Trend recommendation response
#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    #[serde(flatten)]
    pub assessment: TrendAssessment,
    pub lookback: usize,
    pub rejected: Vec<RejectedPoint>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy
    pub status: String,
    /// Target range the service classifies against
    pub target_range: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
