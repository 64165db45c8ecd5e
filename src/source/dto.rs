//! Wire types for the CGM API
//!
//! The API returns loosely-typed JSON: timestamps in several formats,
//! numbers that may be strings or null, insights with or without an
//! envelope. These types accept all of that and convert into the strongly
//! typed `GlucoseReading` and `Insights` before anything reaches the engine.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{MalformedReading, SourceError, SourceResult};
use crate::metrics::{validate_insights, GlucoseReading, Insights};

// ============================================
// POINTS
// ============================================

/// A glucose point as sent by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PointDto {
    #[serde(default)]
    pub timestamp: Value,
    #[serde(default)]
    pub glucose_value: Value,
}

impl PointDto {
    pub fn new(timestamp: impl Into<String>, glucose_value: f64) -> Self {
        Self {
            timestamp: Value::String(timestamp.into()),
            glucose_value: Value::from(glucose_value),
        }
    }

    /// Convert into a reading, or explain why the point is unusable
    pub fn to_reading(&self) -> Result<GlucoseReading, MalformedReading> {
        let timestamp = match &self.timestamp {
            Value::Null => return Err(MalformedReading::MissingTimestamp),
            Value::String(s) => parse_timestamp(s)
                .ok_or_else(|| MalformedReading::InvalidTimestamp(s.clone()))?,
            Value::Number(n) => n
                .as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .ok_or_else(|| MalformedReading::InvalidTimestamp(n.to_string()))?,
            other => return Err(MalformedReading::InvalidTimestamp(other.to_string())),
        };

        let value = match &self.glucose_value {
            Value::Null => return Err(MalformedReading::MissingValue),
            Value::Number(n) => n.as_f64().ok_or(MalformedReading::NonFiniteValue)?,
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| MalformedReading::NonNumericValue(s.clone()))?,
            other => return Err(MalformedReading::NonNumericValue(other.to_string())),
        };

        if !value.is_finite() {
            return Err(MalformedReading::NonFiniteValue);
        }
        if value < 0.0 {
            return Err(MalformedReading::NegativeValue(value));
        }

        Ok(GlucoseReading::new(timestamp, value))
    }
}

impl From<&GlucoseReading> for PointDto {
    fn from(reading: &GlucoseReading) -> Self {
        Self {
            timestamp: Value::String(reading.timestamp.to_rfc3339()),
            glucose_value: Value::from(reading.value),
        }
    }
}

/// Response body of the points endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PointsPayload {
    #[serde(default)]
    pub points_count: Option<usize>,
    pub points: Vec<PointDto>,
}

impl PointsPayload {
    pub fn parse(body: &str) -> SourceResult<Self> {
        serde_json::from_str(body).map_err(|e| SourceError::InvalidPayload(format!("points: {}", e)))
    }

    /// Number of points the API says it returned
    pub fn count(&self) -> usize {
        self.points_count.unwrap_or(self.points.len())
    }
}

/// A point dropped at the boundary
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RejectedPoint {
    /// Position in the original payload
    pub index: usize,
    pub reason: String,
}

/// Readings that passed validation plus the ones that did not
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointBatch {
    pub readings: Vec<GlucoseReading>,
    pub rejected: Vec<RejectedPoint>,
}

impl PointBatch {
    /// Validate every point, keeping the good ones
    pub fn from_points(points: &[PointDto]) -> Self {
        let mut batch = PointBatch::default();

        for (index, point) in points.iter().enumerate() {
            match point.to_reading() {
                Ok(reading) => batch.readings.push(reading),
                Err(e) => batch.rejected.push(RejectedPoint {
                    index,
                    reason: e.to_string(),
                }),
            }
        }

        if !batch.rejected.is_empty() {
            tracing::warn!(
                accepted = batch.readings.len(),
                rejected = batch.rejected.len(),
                "Dropped malformed glucose points"
            );
        }

        batch
    }

    /// Parse a points response body
    pub fn from_json(body: &str) -> SourceResult<Self> {
        let payload = PointsPayload::parse(body)?;
        Ok(Self::from_points(&payload.points))
    }
}

// ============================================
// INSIGHTS
// ============================================

/// Insights record as sent by the API
///
/// The backend reports `null` statistics for an empty window.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InsightsDto {
    #[serde(default)]
    pub avg_glucose: Option<f64>,
    #[serde(default)]
    pub min_glucose: Option<f64>,
    #[serde(default)]
    pub max_glucose: Option<f64>,
    #[serde(default)]
    pub time_in_range_pct: Option<f64>,
    #[serde(default)]
    pub total_points: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highs_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lows_count: Option<usize>,
}

impl InsightsDto {
    /// Convert into a validated `Insights`
    pub fn to_insights(&self) -> SourceResult<Insights> {
        let total_points = self
            .total_points
            .ok_or_else(|| SourceError::InvalidPayload("missing total_points".to_string()))?;

        let field = |name: &str, value: Option<f64>| -> SourceResult<f64> {
            match value {
                Some(v) => Ok(v),
                None if total_points == 0 => Ok(0.0),
                None => Err(SourceError::InvalidPayload(format!("missing {}", name))),
            }
        };

        let insights = Insights {
            average_glucose: field("avg_glucose", self.avg_glucose)?,
            min_glucose: field("min_glucose", self.min_glucose)?,
            max_glucose: field("max_glucose", self.max_glucose)?,
            time_in_range_pct: field("time_in_range_pct", self.time_in_range_pct)?,
            total_points,
        };

        validate_insights(&insights)?;
        Ok(insights)
    }
}

impl From<&Insights> for InsightsDto {
    fn from(insights: &Insights) -> Self {
        let rounded = insights.rounded();
        Self {
            avg_glucose: Some(rounded.average_glucose),
            min_glucose: Some(rounded.min_glucose),
            max_glucose: Some(rounded.max_glucose),
            time_in_range_pct: Some(rounded.time_in_range_pct),
            total_points: Some(rounded.total_points),
            highs_count: None,
            lows_count: None,
        }
    }
}

/// Insights response body, enveloped or flat
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InsightsBody {
    Wrapped { insights: InsightsDto },
    Flat(InsightsDto),
}

impl InsightsBody {
    pub fn into_dto(self) -> InsightsDto {
        match self {
            InsightsBody::Wrapped { insights } => insights,
            InsightsBody::Flat(dto) => dto,
        }
    }

    /// Parse and validate an insights response body
    pub fn parse(body: &str) -> SourceResult<Insights> {
        let parsed: InsightsBody = serde_json::from_str(body)
            .map_err(|e| SourceError::InvalidPayload(format!("insights: {}", e)))?;
        parsed.into_dto().to_insights()
    }
}

// ============================================
// UPLOAD
// ============================================

/// Response body of the upload endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub inserted_count: Option<u64>,
}

// ============================================
// TIMESTAMPS
// ============================================

/// Parse a timestamp in any of the formats the API emits
///
/// Naive timestamps are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    for fmt in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 8, 5, 0).unwrap();

        assert_eq!(parse_timestamp("2024-01-01T08:05:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T10:05:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T08:05:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T08:05:00.000"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01 08:05:00"), Some(expected));
        assert_eq!(parse_timestamp(" 2024-01-01 08:05 "), Some(expected));
        assert_eq!(
            parse_timestamp("2024-01-01"),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_points_skip_and_report() {
        let body = r#"{
            "points_count": 6,
            "points": [
                {"timestamp": "2024-01-01T08:00:00", "glucose_value": 120},
                {"timestamp": "2024-01-01T08:05:00", "glucose_value": "125.5"},
                {"glucose_value": 130},
                {"timestamp": "not a date", "glucose_value": 118},
                {"timestamp": "2024-01-01T08:20:00", "glucose_value": -4},
                {"timestamp": "2024-01-01T08:25:00", "glucose_value": "high"}
            ]
        }"#;

        let batch = PointBatch::from_json(body).unwrap();

        assert_eq!(batch.readings.len(), 2);
        assert_eq!(batch.readings[1].value, 125.5);
        let indices: Vec<usize> = batch.rejected.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![2, 3, 4, 5]);
        assert_eq!(batch.rejected[0].reason, "missing timestamp");
        assert_eq!(batch.rejected[2].reason, "negative glucose_value: -4");
    }

    #[test]
    fn test_points_count_falls_back_to_length() {
        let payload = PointsPayload::parse(r#"{"points_count": 2000, "points": []}"#).unwrap();
        assert_eq!(payload.count(), 2000);

        let payload = PointsPayload::parse(
            r#"{"points": [{"timestamp": "2024-01-01T08:00:00", "glucose_value": 120}]}"#,
        )
        .unwrap();
        assert_eq!(payload.count(), 1);
    }

    #[test]
    fn test_points_wrong_shape_is_rejected() {
        let err = PointBatch::from_json(r#"{"data": []}"#).unwrap_err();
        assert!(matches!(err, SourceError::InvalidPayload(_)));

        let err = PointBatch::from_json("<html>").unwrap_err();
        assert!(matches!(err, SourceError::InvalidPayload(_)));
    }

    #[test]
    fn test_point_millis_timestamp() {
        let point = PointDto {
            timestamp: Value::from(1_704_096_000_000_i64),
            glucose_value: Value::from(101),
        };
        let reading = point.to_reading().unwrap();

        assert_eq!(reading.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap());
        assert_eq!(reading.value, 101.0);
    }

    #[test]
    fn test_point_round_trip_through_reading() {
        let reading = GlucoseReading::new(Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap(), 99.5);
        let dto = PointDto::from(&reading);
        assert_eq!(dto.to_reading().unwrap(), reading);
    }

    #[test]
    fn test_insights_wrapped_and_flat() {
        let wrapped = r#"{"insights": {"avg_glucose": 128.33, "min_glucose": 65,
            "max_glucose": 200, "time_in_range_pct": 33.33, "total_points": 3}}"#;
        let flat = r#"{"user_id": "u1", "start": null, "end": null, "avg_glucose": 128.33,
            "min_glucose": 65.0, "max_glucose": 200.0, "time_in_range_pct": 33.33,
            "total_points": 3, "highs_count": 1, "lows_count": 1}"#;

        let a = InsightsBody::parse(wrapped).unwrap();
        let b = InsightsBody::parse(flat).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.total_points, 3);
        assert_eq!(a.min_glucose, 65.0);
    }

    #[test]
    fn test_insights_empty_window_nulls() {
        let body = r#"{"avg_glucose": null, "min_glucose": null, "max_glucose": null,
            "time_in_range_pct": null, "total_points": 0, "highs_count": 0, "lows_count": 0}"#;

        let insights = InsightsBody::parse(body).unwrap();
        assert_eq!(insights, Insights::empty());
    }

    #[test]
    fn test_insights_missing_field_rejected() {
        let body = r#"{"insights": {"avg_glucose": 120, "max_glucose": 150,
            "time_in_range_pct": 80, "total_points": 10}}"#;

        let err = InsightsBody::parse(body).unwrap_err();
        assert!(matches!(err, SourceError::InvalidPayload(ref m) if m == "missing min_glucose"));
    }

    #[test]
    fn test_insights_invariant_violation_rejected() {
        let body = r#"{"insights": {"avg_glucose": 120, "min_glucose": 130,
            "max_glucose": 150, "time_in_range_pct": 80, "total_points": 10}}"#;

        let err = InsightsBody::parse(body).unwrap_err();
        assert!(matches!(err, SourceError::InvalidInsights(_)));
    }

    #[test]
    fn test_insights_dto_from_insights_is_rounded() {
        let insights = Insights {
            average_glucose: 385.0 / 3.0,
            min_glucose: 65.0,
            max_glucose: 200.0,
            time_in_range_pct: 100.0 / 3.0,
            total_points: 3,
        };

        let dto = InsightsDto::from(&insights);
        assert_eq!(dto.avg_glucose, Some(128.33));
        assert_eq!(dto.time_in_range_pct, Some(33.33));

        let json = serde_json::to_string(&dto).unwrap();
        assert!(!json.contains("highs_count"));
        assert!(dto.to_insights().unwrap().agrees_with(&insights));
    }

    #[test]
    fn test_insights_dto_rounds_ties_to_even() {
        // 801/8 and 803/8 land exactly on a tie
        let low_tie = Insights {
            average_glucose: 801.0 / 8.0,
            min_glucose: 100.0,
            max_glucose: 101.0,
            time_in_range_pct: 100.0,
            total_points: 8,
        };
        let high_tie = Insights {
            average_glucose: 803.0 / 8.0,
            ..low_tie
        };

        assert_eq!(InsightsDto::from(&low_tie).avg_glucose, Some(100.12));
        assert_eq!(InsightsDto::from(&high_tie).avg_glucose, Some(100.38));
    }
}
