//! # Metrics Collection
//!
//! Prometheus metrics for the School API. Recording is a no-op until
//! [`init_metrics`] installs the exporter.

use crate::config::ObservabilityConfig;
use crate::errors::{Result, SchoolApiError};
use ::tracing::{info, warn};
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};
use tokio::sync::RwLock;

/// Metrics recorder that tracks application metrics
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    /// Create a new metrics recorder instance
    pub fn new() -> Self {
        Self
    }

    /// Record an HTTP request
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration: f64) {
        let labels = [
            ("method", method.to_string()),
            ("path", path.to_string()),
            ("status", status.to_string()),
        ];
        counter!("http_requests_total", &labels).increment(1);

        let duration_labels = [("method", method.to_string()), ("path", path.to_string())];
        histogram!("http_request_duration_seconds", &duration_labels).record(duration);
    }

    /// Record authentication attempt outcome
    pub fn record_authentication(&self, status: &str) {
        let labels = [("status", status.to_string())];
        counter!("auth_authentications_total", &labels).increment(1);
    }

    /// Record a committed organization mutation (create, update, delete)
    pub fn record_organization_mutation(&self, operation: &str) {
        let labels = [("op", operation.to_string())];
        counter!("organizations_mutations_total", &labels).increment(1);
    }

    /// Record a student registration outcome
    pub fn record_registration(&self, status: &str) {
        let labels = [("status", status.to_string())];
        counter!("auth_registrations_total", &labels).increment(1);
    }

    fn describe(&self) {
        describe_counter!("http_requests_total", Unit::Count, "HTTP requests by method, path and status");
        describe_histogram!(
            "http_request_duration_seconds",
            Unit::Seconds,
            "HTTP request latency"
        );
        describe_counter!(
            "auth_authentications_total",
            Unit::Count,
            "Login attempts by outcome"
        );
        describe_counter!(
            "auth_registrations_total",
            Unit::Count,
            "Registration attempts by outcome"
        );
        describe_counter!(
            "organizations_mutations_total",
            Unit::Count,
            "Committed organization changes by operation"
        );

        counter!("auth_authentications_total", "status" => "success").absolute(0);
        counter!("auth_authentications_total", "status" => "invalid_credentials").absolute(0);
    }
}

/// Global metrics recorder instance
static METRICS: LazyLock<Arc<RwLock<Option<MetricsRecorder>>>> =
    LazyLock::new(|| Arc::new(RwLock::new(None)));

/// Initialize metrics collection and Prometheus exporter
pub async fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    if !config.enable_metrics {
        return Ok(());
    }

    let metrics_addr = match config.metrics_bind_address() {
        Some(addr) => addr,
        None => {
            warn!("Metrics disabled: no bind address configured");
            return Ok(());
        }
    };

    let socket_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
        SchoolApiError::config(format!("Invalid metrics bind address '{}': {}", metrics_addr, e))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", &config.service_name)
        .install()
        .map_err(|e| {
            SchoolApiError::config(format!("Failed to initialize metrics exporter: {}", e))
        })?;

    let recorder = MetricsRecorder::new();
    recorder.describe();
    {
        let mut metrics = METRICS.write().await;
        *metrics = Some(recorder);
    }

    info!(
        metrics_addr = %metrics_addr,
        service_name = %config.service_name,
        "Metrics collection initialized"
    );

    Ok(())
}

/// Get the global metrics recorder
pub async fn get_metrics() -> Option<MetricsRecorder> {
    METRICS.read().await.clone()
}

/// Record an HTTP request using the global metrics recorder
pub async fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_http_request(method, path, status, duration);
    }
}

/// Record authentication attempt outcome via the global recorder
pub async fn record_authentication(status: &str) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_authentication(status);
    }
}

/// Record registration outcome via the global recorder
pub async fn record_registration(status: &str) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_registration(status);
    }
}

/// Record a committed organization mutation via the global recorder
pub async fn record_organization_mutation(operation: &str) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_organization_mutation(operation);
    }
}
