//! CGM API Data Source
//!
//! Fetches readings and server-side insights from the CGM API and uploads
//! CSV files to it:
//!
//! - **client**: `DataSource` trait and the reqwest-backed `HttpDataSource`
//! - **dto**: Loosely-typed wire records and their validated conversions
//! - **upload**: Pre-flight checks and progress reporting for uploads
//! - **error**: Error types
//!
//! Malformed points never reach the engine: they are dropped at the
//! boundary and reported alongside the readings that survived.

pub mod client;
pub mod dto;
pub mod error;
pub mod upload;

pub use client::{DataSource, HttpDataSource};
pub use dto::{
    parse_timestamp, InsightsBody, InsightsDto, PointBatch, PointDto, RejectedPoint,
    UploadResponse,
};
pub use error::{MalformedReading, SourceError, SourceResult};
pub use upload::{preflight, ProgressReporter, MAX_UPLOAD_BYTES};

use serde::Serialize;

use crate::metrics::{InsightReport, Insights, MetricsEngine, TimeWindow};

/// Report built from fetched readings, with the points that were dropped
#[derive(Debug, Clone, Serialize)]
pub struct LoadedReport {
    pub report: InsightReport,
    pub rejected: Vec<RejectedPoint>,
}

/// Fetch the readings for `window` and build a report over them
pub async fn load_report<S>(
    source: &S,
    engine: &MetricsEngine,
    window: TimeWindow,
) -> SourceResult<LoadedReport>
where
    S: DataSource + ?Sized,
{
    let batch = source.fetch_readings(&window).await?;
    Ok(LoadedReport {
        report: engine.report(&batch.readings, window),
        rejected: batch.rejected,
    })
}

/// Server-side insights next to the locally computed ones
#[derive(Debug, Clone, Serialize)]
pub struct CrossCheck {
    pub server: Insights,
    pub local: Insights,
    /// Whether both agree at display precision
    pub agrees: bool,
}

/// Compare the server's insights for `window` with insights computed from
/// the same window of points, both under the engine's target range
pub async fn cross_check<S>(
    source: &S,
    engine: &MetricsEngine,
    window: TimeWindow,
) -> SourceResult<CrossCheck>
where
    S: DataSource + ?Sized,
{
    let server = source
        .fetch_insights(&window, &engine.target_range())
        .await?;
    let batch = source.fetch_readings(&window).await?;
    let local = engine.compute_insights(&batch.readings);
    let agrees = server.agrees_with(&local);

    if !agrees {
        tracing::warn!(
            server_avg = server.average_glucose,
            local_avg = local.average_glucose,
            server_points = server.total_points,
            local_points = local.total_points,
            "Server insights disagree with local computation"
        );
    }

    Ok(CrossCheck {
        server,
        local,
        agrees,
    })
}
