//! Insights record
//!
//! Summary statistics of a window of readings, plus the rounding rules
//! used whenever a figure is shown or compared across code paths.

use serde::{Deserialize, Serialize};

use super::error::InsightsError;

/// Decimal places used by the rounded view
pub const DISPLAY_DECIMALS: i32 = 2;

/// Round to the given number of decimals, ties to even
///
/// Ties are decided on the exact binary value, matching the CGM API's
/// `round(x, 2)`: 100.125 is a tie and becomes 100.12, while 2.675 is
/// stored just below 2.675 and becomes 2.67. Every rounded figure in the
/// crate goes through here.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }

    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    if !scaled.is_finite() || scaled.abs() >= 2f64.powi(52) {
        return value;
    }

    // Exact error of the multiplication: value * factor == scaled + error
    let error = value.mul_add(factor, -scaled);
    let floor = scaled.floor();

    let rounded = if scaled - floor == 0.5 {
        if error > 0.0 {
            floor + 1.0
        } else if error < 0.0 {
            floor
        } else if floor % 2.0 == 0.0 {
            floor
        } else {
            floor + 1.0
        }
    } else {
        scaled.round()
    };

    rounded / factor
}

/// Summary statistics for a window of glucose readings
///
/// All figures are exact. When `total_points == 0` every numeric field
/// is `0.0`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Insights {
    /// Arithmetic mean in mg/dL
    pub average_glucose: f64,
    /// Lowest reading in mg/dL
    pub min_glucose: f64,
    /// Highest reading in mg/dL
    pub max_glucose: f64,
    /// Percentage of readings inside the target range
    pub time_in_range_pct: f64,
    /// Number of readings in the window
    pub total_points: usize,
}

impl Insights {
    /// The defined state for an empty window
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.total_points == 0
    }

    /// Average rounded to a whole mg/dL
    pub fn average_glucose_mg_dl(&self) -> i64 {
        round_to(self.average_glucose, 0) as i64
    }

    /// Copy with average and time in range rounded to two decimals
    pub fn rounded(&self) -> Insights {
        Insights {
            average_glucose: round_to(self.average_glucose, DISPLAY_DECIMALS),
            min_glucose: self.min_glucose,
            max_glucose: self.max_glucose,
            time_in_range_pct: round_to(self.time_in_range_pct, DISPLAY_DECIMALS),
            total_points: self.total_points,
        }
    }

    /// Check whether two records describe the same window
    ///
    /// Records agree when their rounded views are identical. This is how a
    /// server-supplied record is compared with a local recomputation.
    pub fn agrees_with(&self, other: &Insights) -> bool {
        self.rounded() == other.rounded()
    }

    /// Validate the record against the invariants of an insights window
    pub fn validate(&self) -> Result<(), InsightsError> {
        let fields = [
            ("avg_glucose", self.average_glucose),
            ("min_glucose", self.min_glucose),
            ("max_glucose", self.max_glucose),
            ("time_in_range_pct", self.time_in_range_pct),
        ];

        for (field, value) in fields {
            if !value.is_finite() {
                return Err(InsightsError::NonFinite { field });
            }
            if value < 0.0 {
                return Err(InsightsError::Negative { field, value });
            }
        }

        if self.time_in_range_pct > 100.0 {
            return Err(InsightsError::TimeInRangeOutOfBounds(self.time_in_range_pct));
        }

        if self.is_empty() {
            if fields.iter().any(|(_, v)| *v != 0.0) {
                return Err(InsightsError::NonZeroEmpty);
            }
            return Ok(());
        }

        // Server averages may already be rounded to two decimals, so compare
        // the extrema against the rounded bounds as well as the exact ones.
        let avg = self.average_glucose;
        let lower_ok = self.min_glucose <= avg || self.min_glucose <= round_up(avg);
        let upper_ok = avg <= self.max_glucose || round_down(avg) <= self.max_glucose;
        if !(lower_ok && upper_ok && self.min_glucose <= self.max_glucose) {
            return Err(InsightsError::InconsistentExtrema {
                min: self.min_glucose,
                average: avg,
                max: self.max_glucose,
            });
        }

        Ok(())
    }
}

/// Validate a record supplied from outside the engine
pub fn validate_insights(insights: &Insights) -> Result<(), InsightsError> {
    insights.validate()
}

fn round_up(value: f64) -> f64 {
    value + 0.5 * 10f64.powi(-DISPLAY_DECIMALS)
}

fn round_down(value: f64) -> f64 {
    value - 0.5 * 10f64.powi(-DISPLAY_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Insights {
        Insights {
            average_glucose: 385.0 / 3.0,
            min_glucose: 65.0,
            max_glucose: 200.0,
            time_in_range_pct: 100.0 / 3.0,
            total_points: 3,
        }
    }

    #[test]
    fn test_round_ties_to_even() {
        assert_eq!(round_to(2.5, 0), 2.0);
        assert_eq!(round_to(3.5, 0), 4.0);
        assert_eq!(round_to(-2.5, 0), -2.0);
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(100.125, 2), 100.12);
        assert_eq!(round_to(100.375, 2), 100.38);
        assert_eq!(round_to(-100.125, 2), -100.12);
        assert_eq!(round_to(128.333333, 2), 128.33);
        assert_eq!(round_to(33.335, 1), 33.3);
    }

    #[test]
    fn test_round_uses_exact_binary_value() {
        // Stored just below the decimal tie
        assert_eq!(round_to(2.675, 2), 2.67);
        assert_eq!(round_to(1.115, 2), 1.11);
        assert_eq!(round_to(1.005, 2), 1.0);
        assert_eq!(round_to(0.285, 2), 0.28);
        // Stored just above it
        assert_eq!(round_to(1.245, 2), 1.25);
        assert!(round_to(f64::NAN, 2).is_nan());
    }

    #[test]
    fn test_tied_average_agrees_with_server() {
        // Seven readings of 100 and one of 101 average exactly 100.125
        let local = Insights {
            average_glucose: 801.0 / 8.0,
            min_glucose: 100.0,
            max_glucose: 101.0,
            time_in_range_pct: 100.0,
            total_points: 8,
        };
        let server = Insights {
            average_glucose: 100.12,
            ..local
        };

        assert_eq!(local.rounded().average_glucose, 100.12);
        assert!(local.agrees_with(&server));
    }

    #[test]
    fn test_rounded_view() {
        let rounded = sample().rounded();

        assert_eq!(rounded.average_glucose, 128.33);
        assert_eq!(rounded.time_in_range_pct, 33.33);
        assert_eq!(rounded.min_glucose, 65.0);
        assert_eq!(rounded.total_points, 3);
        assert_eq!(sample().average_glucose_mg_dl(), 128);
    }

    #[test]
    fn test_agrees_with_rounded_server_record() {
        let server = Insights {
            average_glucose: 128.33,
            time_in_range_pct: 33.33,
            ..sample()
        };

        assert!(sample().agrees_with(&server));
        assert!(server.agrees_with(&sample()));

        let other = Insights {
            total_points: 4,
            ..server
        };
        assert!(!sample().agrees_with(&other));
    }

    #[test]
    fn test_validate_accepts_consistent_records() {
        assert!(sample().validate().is_ok());
        assert!(Insights::empty().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_records() {
        let bad_tir = Insights {
            time_in_range_pct: 100.5,
            ..sample()
        };
        assert_eq!(
            bad_tir.validate(),
            Err(InsightsError::TimeInRangeOutOfBounds(100.5))
        );

        let nan = Insights {
            average_glucose: f64::NAN,
            ..sample()
        };
        assert!(matches!(nan.validate(), Err(InsightsError::NonFinite { .. })));

        let negative = Insights {
            min_glucose: -1.0,
            ..sample()
        };
        assert!(matches!(negative.validate(), Err(InsightsError::Negative { .. })));

        let inverted = Insights {
            average_glucose: 250.0,
            ..sample()
        };
        assert!(matches!(
            inverted.validate(),
            Err(InsightsError::InconsistentExtrema { .. })
        ));

        let non_zero_empty = Insights {
            average_glucose: 100.0,
            min_glucose: 100.0,
            max_glucose: 100.0,
            time_in_range_pct: 0.0,
            total_points: 0,
        };
        assert_eq!(non_zero_empty.validate(), Err(InsightsError::NonZeroEmpty));
    }

    #[test]
    fn test_validate_tolerates_rounded_average() {
        // avg of [100.004, 100.004] rounded by a server to 100.0 is still valid
        let rounded = Insights {
            average_glucose: 100.0,
            min_glucose: 100.004,
            max_glucose: 100.004,
            time_in_range_pct: 100.0,
            total_points: 2,
        };
        assert!(rounded.validate().is_ok());
    }
}
