//! # Structured Logging
//!
//! Subscriber setup and span helpers built on the tracing ecosystem.
//!
//! The filter comes from `RUST_LOG` when set, otherwise from
//! `observability.log_level`. With `observability.json_logging` every event is
//! emitted as one JSON object per line, including the fields of its spans.

use crate::config::ObservabilityConfig;
use crate::errors::Result;
use tracing_subscriber::{fmt, EnvFilter};

/// Create a tracing span for request tracking.
///
/// ```rust,ignore
/// let span = request_span!("GET", "/organizations");
/// let span = request_span!("POST", "/authentication/login", user_name = "jdoe");
/// ```
#[macro_export]
macro_rules! request_span {
    ($method:expr, $path:expr) => {
        tracing::info_span!(
            "http_request",
            method = %$method,
            path = %$path,
            request_id = %uuid::Uuid::new_v4(),
            user_name = tracing::field::Empty
        )
    };
    ($method:expr, $path:expr, $($field:tt)*) => {
        tracing::info_span!(
            "http_request",
            method = %$method,
            path = %$path,
            request_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global subscriber.
///
/// Installing twice is not an error: the second call keeps the subscriber
/// that is already in place, which is what test binaries need.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = if config.json_logging {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(false)
            .try_init()
    } else {
        fmt().with_env_filter(filter).with_target(true).try_init()
    };

    if installed.is_err() {
        tracing::debug!("Global subscriber already installed; keeping it");
    }

    Ok(())
}

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        service_name = %config.observability.service_name,
        server_address = %config.server.bind_address(),
        database_auto_migrate = config.database.auto_migrate,
        cors_enabled = config.server.enable_cors,
        metrics_enabled = config.observability.enable_metrics,
        token_expiry_minutes = config.auth.token_expiry_minutes,
        jwt_algorithm = %config.auth.jwt_algorithm,
        "School API configuration"
    );
}
