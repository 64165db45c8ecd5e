//! Trend assessment
//!
//! Rule-based short-term risk from the slope of the most recent readings.

use serde::{Deserialize, Serialize};

use super::types::GlucoseReading;

/// Number of recent readings used when no lookback is given
pub const DEFAULT_LOOKBACK: usize = 6;

/// Risk level of the current trend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum TrendRisk {
    Low,
    Medium,
    High,
}

/// Recommendation derived from the recent trend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendAssessment {
    pub risk: TrendRisk,
    pub score: f64,
    pub advice: String,
    /// Mean change between successive readings, mg/dL per reading
    pub slope: f64,
}

impl TrendAssessment {
    fn new(risk: TrendRisk, score: f64, advice: &str, slope: f64) -> Self {
        Self {
            risk,
            score,
            advice: advice.to_string(),
            slope,
        }
    }
}

/// Assess the trend over the last `lookback` readings by timestamp
///
/// A lookback of 0 considers every reading. A single considered reading
/// has no slope and reads as stable.
pub fn assess_trend(readings: &[GlucoseReading], lookback: usize) -> TrendAssessment {
    if readings.is_empty() || readings.len() < lookback {
        return TrendAssessment::new(TrendRisk::Low, 0.05, "Insufficient data.", 0.0);
    }

    let mut sorted = readings.to_vec();
    sorted.sort_by_key(|r| r.timestamp);

    let considered = if lookback == 0 { sorted.len() } else { lookback };
    let recent: Vec<f64> = sorted[sorted.len() - considered..]
        .iter()
        .map(|r| r.value)
        .collect();
    let slope = mean_slope(&recent);
    let latest = recent[recent.len() - 1];

    if slope < -2.0 && latest < 90.0 {
        TrendAssessment::new(
            TrendRisk::High,
            0.9,
            "Rapid fall detected. Consider fast carbs & retest in 15 min.",
            slope,
        )
    } else if slope < -1.0 {
        TrendAssessment::new(TrendRisk::Medium, 0.45, "Downward trend. Monitor closely.", slope)
    } else if slope > 2.0 && latest > 180.0 {
        TrendAssessment::new(
            TrendRisk::High,
            0.85,
            "Rapid rise detected. Consider action per care plan.",
            slope,
        )
    } else if slope > 1.0 {
        TrendAssessment::new(TrendRisk::Medium, 0.4, "Rising glucose. Observe.", slope)
    } else {
        TrendAssessment::new(TrendRisk::Low, 0.1, "Stable readings.", slope)
    }
}

/// Mean of successive differences
fn mean_slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let total: f64 = values.windows(2).map(|w| w[1] - w[0]).sum();
    total / (values.len() - 1) as f64
}
