//! Glucose Metrics Engine
//!
//! Pure, synchronous derivation of glucose statistics:
//!
//! - **types**: Readings, target range, time window, status and flags
//! - **insights**: The `Insights` record, rounding and validation
//! - **engine**: `MetricsEngine` and the report built for a window
//! - **trend**: Rule-based short-term trend assessment
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust
//! use cgm_trace::metrics::{classify_control, compute_insights, ControlStatus, GlucoseReading};
//!
//! let readings: Vec<GlucoseReading> = [100.0, 120.0, 140.0]
//!     .iter()
//!     .enumerate()
//!     .filter_map(|(i, &v)| GlucoseReading::at_millis(i as i64 * 300_000, v))
//!     .collect();
//!
//! let insights = compute_insights(&readings);
//! assert_eq!(insights.average_glucose, 120.0);
//! assert_eq!(classify_control(&insights), ControlStatus::Good);
//! ```

pub mod engine;
pub mod error;
pub mod insights;
pub mod trend;
pub mod types;

pub use engine::{
    classify_control, compute_insights, derive_risk_flags, variability, ExcursionCounts,
    InsightReport, MetricsEngine, Variability,
};
pub use error::InsightsError;
pub use insights::{round_to, validate_insights, Insights};
pub use trend::{assess_trend, TrendAssessment, TrendRisk, DEFAULT_LOOKBACK};
pub use types::{ControlStatus, GlucoseReading, RiskFlag, TargetRange, TimeWindow};
