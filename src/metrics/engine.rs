//! Metrics Engine
//!
//! Turns a collection of glucose readings into `Insights`, and insights
//! into a `ControlStatus` and a set of `RiskFlag`s. Pure computation: no
//! I/O, no shared state, safe to call from any number of tasks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::insights::Insights;
use super::trend::{assess_trend, TrendAssessment};
use super::types::{ControlStatus, GlucoseReading, RiskFlag, TargetRange, TimeWindow};

/// Counts of readings relative to the target range
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExcursionCounts {
    pub in_range: usize,
    /// Readings above the upper bound
    pub highs: usize,
    /// Readings below the lower bound
    pub lows: usize,
}

/// Spread of the readings in a window
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Variability {
    /// Population standard deviation in mg/dL
    pub std_dev: f64,
    /// Standard deviation as a percentage of the mean
    pub coefficient_of_variation_pct: f64,
}

/// Everything derived for one window of readings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsightReport {
    pub insights: Insights,
    pub status: ControlStatus,
    pub flags: BTreeSet<RiskFlag>,
    pub excursions: ExcursionCounts,
    pub variability: Variability,
    /// Most recent reading in the window
    pub latest: Option<GlucoseReading>,
    pub target_range: TargetRange,
    pub window: TimeWindow,
}

/// Stateless calculator for glucose statistics and classifications
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsEngine {
    range: TargetRange,
}

impl MetricsEngine {
    /// Create an engine using the given target range
    pub fn new(range: TargetRange) -> Self {
        Self { range }
    }

    pub fn target_range(&self) -> TargetRange {
        self.range
    }

    /// Compute summary statistics over the readings
    ///
    /// Order of `readings` does not matter. An empty slice yields
    /// `Insights::empty()`.
    pub fn compute_insights(&self, readings: &[GlucoseReading]) -> Insights {
        if readings.is_empty() {
            return Insights::empty();
        }

        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut in_range = 0usize;

        for reading in readings {
            sum += reading.value;
            min = min.min(reading.value);
            max = max.max(reading.value);
            if self.range.contains(reading.value) {
                in_range += 1;
            }
        }

        let total = readings.len();
        // Summation error can push the mean of equal values past an
        // extremum. Non-finite input leaves min > max, so no clamp then.
        let mean = sum / total as f64;
        let average = if min <= max { mean.clamp(min, max) } else { mean };

        Insights {
            average_glucose: average,
            min_glucose: min,
            max_glucose: max,
            time_in_range_pct: time_in_range_pct(in_range, total),
            total_points: total,
        }
    }

    /// Derive the risk flags for an insights record
    ///
    /// Each flag is an independent predicate on the record. The empty
    /// record (all zeros) raises `LowGlucoseEvents` and `LowTimeInRange`,
    /// consistent with it classifying as `Alert`.
    pub fn derive_risk_flags(&self, insights: &Insights) -> BTreeSet<RiskFlag> {
        let mut flags = BTreeSet::new();

        if self.range.is_high(insights.max_glucose) {
            flags.insert(RiskFlag::HighGlucoseFrequent);
        }
        if self.range.is_low(insights.min_glucose) {
            flags.insert(RiskFlag::LowGlucoseEvents);
        }
        if insights.time_in_range_pct < super::types::WARNING_TIME_IN_RANGE_PCT {
            flags.insert(RiskFlag::LowTimeInRange);
        }

        flags
    }

    /// Compute insights, status and flags in one call
    pub fn assess(
        &self,
        readings: &[GlucoseReading],
    ) -> (Insights, ControlStatus, BTreeSet<RiskFlag>) {
        let insights = self.compute_insights(readings);
        let status = classify_control(&insights);
        let flags = self.derive_risk_flags(&insights);
        (insights, status, flags)
    }

    /// Count readings inside, above and below the target range
    pub fn excursions(&self, readings: &[GlucoseReading]) -> ExcursionCounts {
        readings
            .iter()
            .fold(ExcursionCounts::default(), |mut counts, reading| {
                if self.range.is_high(reading.value) {
                    counts.highs += 1;
                } else if self.range.is_low(reading.value) {
                    counts.lows += 1;
                } else {
                    counts.in_range += 1;
                }
                counts
            })
    }

    /// Build the full report for the readings inside `window`
    pub fn report(&self, readings: &[GlucoseReading], window: TimeWindow) -> InsightReport {
        let considered = if window.is_unbounded() {
            readings.to_vec()
        } else {
            window.filter(readings)
        };

        let (insights, status, flags) = self.assess(&considered);
        let latest = considered.iter().max_by_key(|r| r.timestamp).copied();

        tracing::debug!(
            readings = readings.len(),
            considered = considered.len(),
            status = %status,
            flags = flags.len(),
            "Computed insight report"
        );

        InsightReport {
            insights,
            status,
            flags,
            excursions: self.excursions(&considered),
            variability: variability(&considered),
            latest,
            target_range: self.range,
            window,
        }
    }

    /// Short-term trend recommendation over the most recent readings
    pub fn trend(&self, readings: &[GlucoseReading], lookback: usize) -> TrendAssessment {
        assess_trend(readings, lookback)
    }
}

/// Classify overall control from an insights record
pub fn classify_control(insights: &Insights) -> ControlStatus {
    ControlStatus::from_time_in_range(insights.time_in_range_pct)
}

/// Compute insights with the default 70-180 mg/dL target range
pub fn compute_insights(readings: &[GlucoseReading]) -> Insights {
    MetricsEngine::default().compute_insights(readings)
}

/// Derive risk flags with the default 70-180 mg/dL target range
pub fn derive_risk_flags(insights: &Insights) -> BTreeSet<RiskFlag> {
    MetricsEngine::default().derive_risk_flags(insights)
}

/// Population standard deviation and coefficient of variation
pub fn variability(readings: &[GlucoseReading]) -> Variability {
    if readings.is_empty() {
        return Variability::default();
    }

    let n = readings.len() as f64;
    let mean = readings.iter().map(|r| r.value).sum::<f64>() / n;
    let variance = readings
        .iter()
        .map(|r| (r.value - mean).powi(2))
        .sum::<f64>()
        / n;
    let std_dev = variance.sqrt();

    let coefficient_of_variation_pct = if mean == 0.0 {
        0.0
    } else {
        100.0 * std_dev / mean
    };

    Variability {
        std_dev,
        coefficient_of_variation_pct,
    }
}

fn time_in_range_pct(in_range: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        in_range as f64 * 100.0 / total as f64
    }
}
