//! Metrics engine error types
//!
//! The engine never fails on well-typed readings. These errors cover
//! insights records supplied from outside and invalid engine parameters.

use thiserror::Error;

/// Errors raised when validating insights or engine parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InsightsError {
    /// A numeric field is NaN or infinite
    #[error("Field {field} is not a finite number")]
    NonFinite { field: &'static str },

    /// A glucose figure is below zero
    #[error("Field {field} is negative: {value}")]
    Negative { field: &'static str, value: f64 },

    /// Time in range is outside 0..=100
    #[error("Time in range out of bounds: {0}")]
    TimeInRangeOutOfBounds(f64),

    /// min <= average <= max does not hold
    #[error("Inconsistent extrema: min={min}, avg={average}, max={max}")]
    InconsistentExtrema { min: f64, average: f64, max: f64 },

    /// An empty window reported non-zero statistics
    #[error("Empty window has non-zero statistics")]
    NonZeroEmpty,

    /// Target range bounds are inverted or invalid
    #[error("Invalid target range: lower={lower}, upper={upper}")]
    InvalidRange { lower: f64, upper: f64 },
}
