//! Data source error types
//!
//! `SourceError` is the transport-failure class: anything that goes wrong
//! fetching from or uploading to the CGM API. `MalformedReading` describes
//! a single point dropped at the boundary.

use thiserror::Error;

use crate::metrics::InsightsError;

/// Errors that can occur when talking to the CGM API
#[derive(Error, Debug)]
pub enum SourceError {
    /// API could not be reached
    #[error("CGM API unavailable")]
    Unavailable,

    /// Request exceeded the configured timeout
    #[error("Request timeout")]
    Timeout,

    /// Lower-level HTTP failure
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// API answered with a non-success status
    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// The API filled a whole page, so the window holds more points
    #[error("Points truncated at limit {limit}; narrow the window or raise points_limit")]
    Truncated { limit: usize },

    /// Insights record violated its invariants
    #[error("Invalid insights: {0}")]
    InvalidInsights(#[from] InsightsError),

    /// File was refused before upload
    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    /// IO error while reading an upload
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Client could not be constructed from configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SourceError {
    /// Classify a reqwest error the way the rest of the client reports it
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if err.is_connect() {
            SourceError::Unavailable
        } else {
            SourceError::Request(err)
        }
    }

    /// Whether a user-initiated retry could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Unavailable | SourceError::Timeout | SourceError::Request(_) => true,
            SourceError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Result type alias for data source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Reason a single point was dropped at the boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedReading {
    #[error("missing timestamp")]
    MissingTimestamp,

    #[error("unparseable timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("missing glucose_value")]
    MissingValue,

    #[error("non-numeric glucose_value: {0}")]
    NonNumericValue(String),

    #[error("glucose_value is not finite")]
    NonFiniteValue,

    #[error("negative glucose_value: {0}")]
    NegativeValue(f64),
}
