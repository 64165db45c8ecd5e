//! # CGM Trace
//!
//! Glucose metrics for continuous glucose monitor data: summary statistics,
//! control classification and risk flags over a window of readings.
//!
//! ## Features
//!
//! - **Pure metrics engine**: Insights, control status and risk flags with
//!   no I/O and no shared state
//! - **Boundary validation**: Malformed points are skipped and reported,
//!   server insights are checked against their invariants
//! - **CGM API client**: Fetch points and insights, upload CSV files with
//!   progress reporting
//! - **Metrics service**: Stateless REST API over the engine
//!
//! ## Modules
//!
//! - [`metrics`]: The metrics engine
//! - [`source`]: CGM API client and wire types
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cgm_trace::config::SourceConfig;
//! use cgm_trace::metrics::{MetricsEngine, TimeWindow};
//! use cgm_trace::source::{load_report, HttpDataSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = HttpDataSource::new(SourceConfig::new("http://localhost:8000"))?;
//!     let engine = MetricsEngine::default();
//!
//!     // Last 14 days of readings
//!     let loaded = load_report(&source, &engine, TimeWindow::last_days(14)).await?;
//!
//!     println!(
//!         "{}: average {} mg/dL, {} points dropped",
//!         loaded.report.status,
//!         loaded.report.insights.average_glucose_mg_dl(),
//!         loaded.rejected.len()
//!     );
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod metrics;
pub mod source;

// Re-export top-level types for convenience
pub use metrics::{
    classify_control, compute_insights, derive_risk_flags, ControlStatus, GlucoseReading,
    InsightReport, Insights, InsightsError, MetricsEngine, RiskFlag, TargetRange, TimeWindow,
};

pub use source::{DataSource, HttpDataSource, PointBatch, SourceError, SourceResult};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{ApiConfig, Config, ConfigError, LoggingConfig, RangesConfig, SourceConfig};
