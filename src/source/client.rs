//! CGM API client
//!
//! HTTP client for the CGM API's points, insights and upload endpoints.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::dto::{InsightsBody, PointBatch, PointsPayload, UploadResponse};
use super::error::{SourceError, SourceResult};
use super::upload::{preflight, ProgressReporter, UPLOAD_CHUNK_BYTES};
use crate::config::SourceConfig;
use crate::metrics::{Insights, TargetRange, TimeWindow};

/// Anything that can hand out readings and server-side insights
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Readings within `window`, with the points dropped at the boundary
    async fn fetch_readings(&self, window: &TimeWindow) -> SourceResult<PointBatch>;

    /// Insights over `window` and `range`, as computed by the server
    async fn fetch_insights(&self, window: &TimeWindow, range: &TargetRange)
        -> SourceResult<Insights>;
}

/// CGM API client over HTTP
pub struct HttpDataSource {
    client: Client,
    config: SourceConfig,
}

impl HttpDataSource {
    /// Create a client from the given configuration
    pub fn new(config: SourceConfig) -> SourceResult<Self> {
        if config.points_limit == 0 {
            return Err(SourceError::Config("points_limit must be at least 1".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| SourceError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and return the body of a successful response
    async fn send_for_text(&self, request: RequestBuilder) -> SourceResult<String> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(SourceError::from_transport)?;

        let response = check_status(response).await?;
        response.text().await.map_err(SourceError::from_transport)
    }

    /// Upload a CSV file of readings
    ///
    /// `on_progress` receives integer percentages that never decrease and
    /// end with 100 once the server has accepted the file. Nothing is sent
    /// for files that fail the pre-flight checks.
    pub async fn upload_csv<F>(&self, path: &Path, on_progress: F) -> SourceResult<UploadResponse>
    where
        F: FnMut(u8) + Send + 'static,
    {
        let size = preflight(path).await?;
        let contents = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.csv")
            .to_string();

        let progress = Arc::new(Mutex::new(ProgressReporter::new(size, on_progress)));
        if let Ok(mut reporter) = progress.lock() {
            reporter.advance(0);
        }

        let chunks: Vec<Vec<u8>> = contents
            .chunks(UPLOAD_CHUNK_BYTES)
            .map(|c| c.to_vec())
            .collect();

        let stream_progress = Arc::clone(&progress);
        let stream = futures_util::stream::iter(chunks).map(move |chunk| {
            if let Ok(mut reporter) = stream_progress.lock() {
                reporter.advance(chunk.len());
            }
            Ok::<Vec<u8>, std::io::Error>(chunk)
        });

        let part = reqwest::multipart::Part::stream_with_length(
            reqwest::Body::wrap_stream(stream),
            size,
        )
        .file_name(filename.clone())
        .mime_str("text/csv")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = self.config.url(&self.config.upload_path);
        tracing::debug!(url = %url, file = %filename, bytes = size, "Uploading readings");

        let body = self
            .send_for_text(self.client.post(&url).multipart(form))
            .await?;

        let result: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| SourceError::InvalidPayload(format!("upload: {}", e)))?;

        if let Ok(mut reporter) = progress.lock() {
            reporter.finish();
        }

        tracing::info!(
            file = %filename,
            inserted = ?result.inserted_count,
            "Upload accepted"
        );

        Ok(result)
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch_readings(&self, window: &TimeWindow) -> SourceResult<PointBatch> {
        let url = self.config.url(&self.config.points_path);
        let limit = self.config.points_limit;

        let mut query = window_query(window);
        query.push(("limit", limit.to_string()));

        let body = self
            .send_for_text(self.client.get(&url).query(&query))
            .await?;
        let payload = PointsPayload::parse(&body)?;

        // The API returns the oldest points first, so a full page has lost
        // the most recent ones.
        if payload.count() >= limit {
            tracing::warn!(url = %url, limit, "Points response filled the limit");
            return Err(SourceError::Truncated { limit });
        }

        let batch = PointBatch::from_points(&payload.points);

        tracing::debug!(
            url = %url,
            accepted = batch.readings.len(),
            rejected = batch.rejected.len(),
            "Fetched glucose points"
        );

        Ok(batch)
    }

    async fn fetch_insights(
        &self,
        window: &TimeWindow,
        range: &TargetRange,
    ) -> SourceResult<Insights> {
        let url = self.config.url(&self.config.insights_path);

        let mut query = window_query(window);
        query.push(("lower_bound", range.lower.to_string()));
        query.push(("upper_bound", range.upper.to_string()));

        let body = self
            .send_for_text(self.client.get(&url).query(&query))
            .await?;
        InsightsBody::parse(&body)
    }
}

fn window_query(window: &TimeWindow) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(start) = window.start {
        query.push(("start", start.to_rfc3339()));
    }
    if let Some(end) = window.end {
        query.push(("end", end.to_rfc3339()));
    }
    query
}

async fn check_status(response: Response) -> SourceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), "CGM API returned an error");
    Err(SourceError::Status {
        status: status.as_u16(),
        message,
    })
}
