//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

const DEFAULT_FILTER: &str = "info,handy_api=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Used when `RUST_LOG` is unset.
    pub default_filter: String,
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl TelemetryConfig {
    /// `HANDY_LOG_FORMAT=json` switches to JSON lines.
    pub fn from_env() -> Self {
        let format = match std::env::var("HANDY_LOG_FORMAT") {
            Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        Self {
            format,
            ..Self::default()
        }
    }
}

/// Install the global subscriber. Fails if one is already set.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))
        .map_err(|e| ApiError::invalid_input(format!("Invalid log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to install tracing subscriber: {}", e)))
}
