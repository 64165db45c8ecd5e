//! Core data types for the glucose metrics engine
//!
//! This module defines the value objects the engine works with:
//! - `GlucoseReading`: A single CGM measurement
//! - `TargetRange`: The clinical target band used for time-in-range
//! - `TimeWindow`: The considered window of readings
//! - `ControlStatus` and `RiskFlag`: Classifications derived from insights

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::InsightsError;

/// Lower bound of the default target range (mg/dL, inclusive)
pub const DEFAULT_LOWER_BOUND: f64 = 70.0;

/// Upper bound of the default target range (mg/dL, inclusive)
pub const DEFAULT_UPPER_BOUND: f64 = 180.0;

/// Time-in-range percentage at or above which control is `Good`
pub const GOOD_TIME_IN_RANGE_PCT: f64 = 70.0;

/// Time-in-range percentage at or above which control is at least `Warning`
pub const WARNING_TIME_IN_RANGE_PCT: f64 = 50.0;

/// A single glucose measurement
///
/// Readings are produced by ingestion outside this crate and are never
/// mutated. The boundary layer guarantees `value` is finite and `>= 0`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GlucoseReading {
    /// When the reading was taken
    pub timestamp: DateTime<Utc>,
    /// Glucose concentration in mg/dL
    pub value: f64,
}

impl GlucoseReading {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Create a reading from a Unix timestamp in milliseconds
    pub fn at_millis(timestamp_ms: i64, value: f64) -> Option<Self> {
        DateTime::from_timestamp_millis(timestamp_ms).map(|timestamp| Self { timestamp, value })
    }
}

/// Clinical target band in mg/dL (inclusive on both ends)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TargetRange {
    pub lower: f64,
    pub upper: f64,
}

impl Default for TargetRange {
    fn default() -> Self {
        Self {
            lower: DEFAULT_LOWER_BOUND,
            upper: DEFAULT_UPPER_BOUND,
        }
    }
}

impl TargetRange {
    /// Create a target range, rejecting inverted or non-finite bounds
    pub fn new(lower: f64, upper: f64) -> Result<Self, InsightsError> {
        if !lower.is_finite() || !upper.is_finite() || lower < 0.0 || lower > upper {
            return Err(InsightsError::InvalidRange { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    /// Check if a value falls within the band
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    pub fn is_high(&self, value: f64) -> bool {
        value > self.upper
    }

    pub fn is_low(&self, value: f64) -> bool {
        value < self.lower
    }
}

impl std::fmt::Display for TargetRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{} mg/dL", self.lower, self.upper)
    }
}

/// The window of readings considered for a computation
///
/// Both bounds are inclusive. A missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// A window that considers every reading
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Window covering the last N days up to now
    pub fn last_days(days: i64) -> Self {
        let end = Utc::now();
        Self {
            start: Some(end - Duration::days(days)),
            end: Some(end),
        }
    }

    /// Check if a timestamp falls within this window
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| timestamp >= s) && self.end.map_or(true, |e| timestamp <= e)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Keep the readings inside the window
    pub fn filter(&self, readings: &[GlucoseReading]) -> Vec<GlucoseReading> {
        readings
            .iter()
            .filter(|r| self.contains(r.timestamp))
            .copied()
            .collect()
    }
}

/// Overall quality of glucose control, keyed off time in range
///
/// Variants are declared worst-first so the derived ordering reads
/// `Alert < Warning < Good`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ControlStatus {
    /// Time in range below 50%
    Alert,
    /// Time in range in [50%, 70%)
    Warning,
    /// Time in range of 70% or more
    Good,
}

impl ControlStatus {
    /// Classify a time-in-range percentage
    pub fn from_time_in_range(pct: f64) -> Self {
        if pct >= GOOD_TIME_IN_RANGE_PCT {
            ControlStatus::Good
        } else if pct >= WARNING_TIME_IN_RANGE_PCT {
            ControlStatus::Warning
        } else {
            ControlStatus::Alert
        }
    }

    /// Headline shown for this status
    pub fn message(&self) -> &'static str {
        match self {
            ControlStatus::Good => "Excellent glucose control!",
            ControlStatus::Warning => "Consider adjustments",
            ControlStatus::Alert => "Needs attention",
        }
    }
}

impl std::fmt::Display for ControlStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlStatus::Good => write!(f, "good"),
            ControlStatus::Warning => write!(f, "warning"),
            ControlStatus::Alert => write!(f, "alert"),
        }
    }
}

/// Specific risk conditions detected in a window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskFlag {
    /// Maximum reading above the target range
    HighGlucoseFrequent,
    /// Minimum reading below the target range
    LowGlucoseEvents,
    /// Less than half of readings in range
    LowTimeInRange,
}

impl RiskFlag {
    /// Get all flags for iteration
    pub fn all() -> &'static [RiskFlag] {
        &[
            RiskFlag::HighGlucoseFrequent,
            RiskFlag::LowGlucoseEvents,
            RiskFlag::LowTimeInRange,
        ]
    }

    pub fn title(&self) -> &'static str {
        match self {
            RiskFlag::HighGlucoseFrequent => "Frequent high glucose readings",
            RiskFlag::LowGlucoseEvents => "Low glucose events detected",
            RiskFlag::LowTimeInRange => "Low time in range",
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            RiskFlag::HighGlucoseFrequent => {
                "You have readings above the target range. Consider reviewing your diet."
            }
            RiskFlag::LowGlucoseEvents => {
                "You experienced hypoglycemic episodes. Always carry fast-acting carbs."
            }
            RiskFlag::LowTimeInRange => {
                "Less than 50% of readings are in target range. Schedule a call with your healthcare provider."
            }
        }
    }
}

impl std::fmt::Display for RiskFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskFlag::HighGlucoseFrequent => write!(f, "high_glucose_frequent"),
            RiskFlag::LowGlucoseEvents => write!(f, "low_glucose_events"),
            RiskFlag::LowTimeInRange => write!(f, "low_time_in_range"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_target_range_inclusive() {
        let range = TargetRange::default();

        assert!(range.contains(70.0));
        assert!(range.contains(180.0));
        assert!(!range.contains(69.9));
        assert!(!range.contains(180.1));
        assert!(range.is_high(180.1));
        assert!(!range.is_high(180.0));
        assert!(range.is_low(69.9));
        assert!(!range.is_low(70.0));
    }

    #[test]
    fn test_target_range_validation() {
        assert!(TargetRange::new(70.0, 180.0).is_ok());
        assert!(TargetRange::new(100.0, 100.0).is_ok());
        assert!(TargetRange::new(180.0, 70.0).is_err());
        assert!(TargetRange::new(-1.0, 70.0).is_err());
        assert!(TargetRange::new(f64::NAN, 70.0).is_err());
    }

    #[test]
    fn test_time_window_contains() {
        let window = TimeWindow::new(Some(ts(8)), Some(ts(10)));

        assert!(!window.contains(ts(7)));
        assert!(window.contains(ts(8)));
        assert!(window.contains(ts(9)));
        assert!(window.contains(ts(10)));
        assert!(!window.contains(ts(11)));

        let open_end = TimeWindow::new(Some(ts(8)), None);
        assert!(open_end.contains(ts(23)));
        assert!(TimeWindow::all().contains(ts(0)));
    }

    #[test]
    fn test_time_window_filter() {
        let readings = vec![
            GlucoseReading::new(ts(6), 90.0),
            GlucoseReading::new(ts(9), 110.0),
            GlucoseReading::new(ts(12), 150.0),
        ];

        let filtered = TimeWindow::new(Some(ts(8)), Some(ts(10))).filter(&readings);
        assert_eq!(filtered, vec![GlucoseReading::new(ts(9), 110.0)]);
    }

    #[test]
    fn test_control_status_ordering() {
        assert!(ControlStatus::Alert < ControlStatus::Warning);
        assert!(ControlStatus::Warning < ControlStatus::Good);
    }

    #[test]
    fn test_control_status_boundaries() {
        assert_eq!(ControlStatus::from_time_in_range(70.0), ControlStatus::Good);
        assert_eq!(ControlStatus::from_time_in_range(69.999), ControlStatus::Warning);
        assert_eq!(ControlStatus::from_time_in_range(50.0), ControlStatus::Warning);
        assert_eq!(ControlStatus::from_time_in_range(49.999), ControlStatus::Alert);
        assert_eq!(ControlStatus::from_time_in_range(0.0), ControlStatus::Alert);
        assert_eq!(ControlStatus::from_time_in_range(100.0), ControlStatus::Good);
    }

    #[test]
    fn test_status_and_flag_serialization() {
        assert_eq!(serde_json::to_string(&ControlStatus::Good).unwrap(), "\"good\"");
        assert_eq!(
            serde_json::to_string(&RiskFlag::LowTimeInRange).unwrap(),
            "\"low_time_in_range\""
        );
        assert_eq!(RiskFlag::HighGlucoseFrequent.to_string(), "high_glucose_frequent");
    }

    #[test]
    fn test_display_text() {
        assert_eq!(ControlStatus::Good.message(), "Excellent glucose control!");
        assert_eq!(ControlStatus::Alert.message(), "Needs attention");

        for flag in RiskFlag::all() {
            assert!(!flag.title().is_empty());
            assert!(!flag.advice().is_empty());
        }
        assert!(RiskFlag::LowTimeInRange.advice().starts_with("Less than 50%"));
    }

    #[test]
    fn test_last_days_window() {
        let window = TimeWindow::last_days(7);
        let (start, end) = (window.start.unwrap(), window.end.unwrap());

        assert_eq!(end - start, Duration::days(7));
        assert!(window.contains(end - Duration::days(3)));
        assert!(!window.contains(start - Duration::seconds(1)));
    }
}
