//! CGM Trace API Server
//!
//! Run with: cargo run --bin cgm-trace-api
//!
//! # Configuration
//!
//! Settings come from the first config file found (see
//! `Config::load_default`), overridden by environment variables:
//! - `CGM_TRACE_API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `CGM_TRACE_API_PORT`: Port to listen on (default: 8000)
//! - `CGM_TRACE_LOG_LEVEL`: Log level (default: info)
//! - `CGM_TRACE_LOG_FORMAT`: `pretty` or `json` (default: pretty)
//! - `RUST_LOG`: Full filter directive, takes precedence over the log level

use anyhow::Context;
use cgm_trace::api::{serve, AppState};
use cgm_trace::config::{Config, LoggingConfig};
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_default();
    init_tracing(&config.logging)?;

    tracing::info!("Starting CGM Trace API server v{}", env!("CARGO_PKG_VERSION"));

    let state = AppState::from_config(&config).context("invalid [ranges] configuration")?;
    tracing::info!("Target range: {}", state.engine.target_range());
    tracing::info!("Trend lookback: {} readings", state.trend_lookback);

    serve(state).await?;

    tracing::info!("CGM Trace API server stopped");
    Ok(())
}

/// Initialize tracing from the logging configuration
fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("cgm_trace={},tower_http=info", config.level))
            .with_context(|| format!("invalid log level {:?}", config.level))?,
    };

    let writer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path))?;
            BoxMakeWriter::new(Arc::new(file))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(config.file.is_none());

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_json() {
        registry.with(fmt_layer.json()).try_init()?;
    } else {
        registry.with(fmt_layer).try_init()?;
    }

    Ok(())
}
