//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::config::{ApiConfig, Config, ConfigError};
use crate::metrics::{MetricsEngine, TargetRange, DEFAULT_LOOKBACK};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Engine configured with the default target range
    pub engine: MetricsEngine,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Readings considered by the trend endpoint when none is requested
    pub trend_lookback: usize,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(engine: MetricsEngine, config: ApiConfig) -> Self {
        Self {
            engine,
            config: Arc::new(config),
            trend_lookback: DEFAULT_LOOKBACK,
            start_time: Instant::now(),
        }
    }

    /// Build state from the full configuration
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let range = config.ranges.target_range()?;
        Ok(Self::new(MetricsEngine::new(range), config.api.clone())
            .with_trend_lookback(config.ranges.trend_lookback))
    }

    /// Builder: set the default trend lookback
    pub fn with_trend_lookback(mut self, lookback: usize) -> Self {
        self.trend_lookback = lookback;
        self
    }

    /// Engine for a request, honouring per-request bounds
    ///
    /// A missing bound falls back to the configured one.
    pub fn engine_for(
        &self,
        lower: Option<f64>,
        upper: Option<f64>,
    ) -> Result<MetricsEngine, crate::metrics::InsightsError> {
        if lower.is_none() && upper.is_none() {
            return Ok(self.engine);
        }

        let configured = self.engine.target_range();
        let range = TargetRange::new(
            lower.unwrap_or(configured.lower),
            upper.unwrap_or(configured.upper),
        )?;
        Ok(MetricsEngine::new(range))
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(MetricsEngine::default(), ApiConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_for_overrides() {
        let state = AppState::default();

        assert_eq!(state.engine_for(None, None).unwrap(), state.engine);

        let engine = state.engine_for(None, Some(140.0)).unwrap();
        assert_eq!(engine.target_range().lower, 70.0);
        assert_eq!(engine.target_range().upper, 140.0);

        assert!(state.engine_for(Some(200.0), None).is_err());
    }

    #[test]
    fn test_from_config() {
        let config = Config::parse("[ranges]\ntrend_lookback = 4\nlower_bound = 80.0\n").unwrap();
        let state = AppState::from_config(&config).unwrap();

        assert_eq!(state.trend_lookback, 4);
        assert_eq!(state.engine.target_range().lower, 80.0);
    }
}
