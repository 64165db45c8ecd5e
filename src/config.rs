//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::metrics::{TargetRange, DEFAULT_LOOKBACK};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub ranges: RangesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metrics service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum number of points accepted in one request
    #[serde(default = "default_max_points")]
    pub max_points: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_points() -> usize {
    100_000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            request_timeout_secs: default_request_timeout(),
            max_points: default_max_points(),
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// CGM API (data source) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the CGM API (e.g., "http://localhost:8000")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_points_path")]
    pub points_path: String,

    #[serde(default = "default_insights_path")]
    pub insights_path: String,

    #[serde(default = "default_upload_path")]
    pub upload_path: String,

    /// Most points requested per fetch, sent as `limit`
    #[serde(default = "default_points_limit")]
    pub points_limit: usize,

    /// Request timeout in milliseconds
    #[serde(default = "default_source_timeout")]
    pub request_timeout_ms: u64,

    /// Bearer token sent with every request
    #[serde(default)]
    pub token: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_points_path() -> String {
    "/glucose/points".to_string()
}

fn default_insights_path() -> String {
    "/insights/summary".to_string()
}

fn default_upload_path() -> String {
    "/glucose/upload".to_string()
}

fn default_points_limit() -> usize {
    20_000
}

fn default_source_timeout() -> u64 {
    10_000
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            points_path: default_points_path(),
            insights_path: default_insights_path(),
            upload_path: default_upload_path(),
            points_limit: default_points_limit(),
            request_timeout_ms: default_source_timeout(),
            token: None,
        }
    }
}

impl SourceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Builder: set the bearer token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Join the base URL and an endpoint path
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Target range and trend settings
#[derive(Debug, Clone, Deserialize)]
pub struct RangesConfig {
    #[serde(default = "default_lower_bound")]
    pub lower_bound: f64,

    #[serde(default = "default_upper_bound")]
    pub upper_bound: f64,

    #[serde(default = "default_trend_lookback")]
    pub trend_lookback: usize,
}

fn default_lower_bound() -> f64 {
    crate::metrics::types::DEFAULT_LOWER_BOUND
}

fn default_upper_bound() -> f64 {
    crate::metrics::types::DEFAULT_UPPER_BOUND
}

fn default_trend_lookback() -> usize {
    DEFAULT_LOOKBACK
}

impl Default for RangesConfig {
    fn default() -> Self {
        Self {
            lower_bound: default_lower_bound(),
            upper_bound: default_upper_bound(),
            trend_lookback: default_trend_lookback(),
        }
    }
}

impl RangesConfig {
    /// Validated target range
    pub fn target_range(&self) -> Result<TargetRange, ConfigError> {
        TargetRange::new(self.lower_bound, self.upper_bound)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("cgm-trace").join("config.toml")),
            Some(PathBuf::from("/etc/cgm-trace/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production)
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // API overrides
        if let Some(host) = lookup("CGM_TRACE_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("CGM_TRACE_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // Source overrides
        if let Some(url) = lookup("CGM_TRACE_SOURCE_URL") {
            self.source.base_url = url;
        }
        if let Some(token) = lookup("CGM_TRACE_TOKEN") {
            if !token.is_empty() {
                self.source.token = Some(token);
            }
        }

        // Logging overrides
        if let Some(level) = lookup("CGM_TRACE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("CGM_TRACE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# CGM Trace Configuration
#
# Environment variables override these settings:
# - CGM_TRACE_API_HOST
# - CGM_TRACE_API_PORT
# - CGM_TRACE_SOURCE_URL
# - CGM_TRACE_TOKEN
# - CGM_TRACE_LOG_LEVEL
# - CGM_TRACE_LOG_FORMAT

[api]
# Metrics service host
host = "0.0.0.0"

# Metrics service port
port = 8000

# Allowed CORS origins (empty = permissive)
cors_origins = []

# Request timeout in seconds
request_timeout_secs = 30

# Maximum points accepted per request
max_points = 100000

[source]
# CGM API base URL
base_url = "http://localhost:8000"

# Endpoint paths
points_path = "/glucose/points"
insights_path = "/insights/summary"
upload_path = "/glucose/upload"

# Most points fetched per request; a full page is reported as truncated
points_limit = 20000

# Request timeout in milliseconds
request_timeout_ms = 10000

# Bearer token (prefer CGM_TRACE_TOKEN)
# token = ""

[ranges]
# Target range in mg/dL (inclusive)
lower_bound = 70.0
upper_bound = 180.0

# Readings used for trend assessment
trend_lookback = 6

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/cgm-trace/cgm-trace.log"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.port, 8000);
        assert_eq!(config.source.points_path, "/glucose/points");
        assert_eq!(config.source.insights_path, "/insights/summary");
        assert_eq!(config.source.points_limit, 20_000);
        assert_eq!(config.ranges.lower_bound, 70.0);
        assert_eq!(config.ranges.upper_bound, 180.0);
        assert_eq!(config.ranges.trend_lookback, 6);
        assert!(!config.logging.is_json());
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.api.addr(), "0.0.0.0:8000");
        assert_eq!(config.source.request_timeout_ms, 10_000);
        assert_eq!(config.source.points_limit, 20_000);
        assert!(config.source.token.is_none());
        assert!(config.ranges.target_range().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::parse("[ranges]\nupper_bound = 140.0\n").unwrap();
        assert_eq!(config.ranges.lower_bound, 70.0);
        assert_eq!(config.ranges.upper_bound, 140.0);
        assert_eq!(config.api.port, 8000);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[source]\nbase_url = \"https://cgm.example.org/\"").unwrap();
        writeln!(file, "[logging]\nformat = \"json\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(
            config.source.url("/glucose/points"),
            "https://cgm.example.org/glucose/points"
        );
        assert!(config.logging.is_json());
    }

    #[test]
    fn test_load_errors() {
        let missing = Config::load(Path::new("/nonexistent/cgm-trace.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api\nport = ").unwrap();
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("CGM_TRACE_API_PORT", "9100"),
            ("CGM_TRACE_SOURCE_URL", "http://cgm:8000"),
            ("CGM_TRACE_TOKEN", "secret"),
            ("CGM_TRACE_LOG_LEVEL", "debug"),
        ]);

        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.api.port, 9100);
        assert_eq!(config.source.base_url, "http://cgm:8000");
        assert_eq!(config.source.token.as_deref(), Some("secret"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.api.host, "0.0.0.0");
    }

    #[test]
    fn test_invalid_range() {
        let config = Config::parse("[ranges]\nlower_bound = 200.0\n").unwrap();
        assert!(matches!(config.ranges.target_range(), Err(ConfigError::Invalid(_))));
    }
}
