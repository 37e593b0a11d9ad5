//! Metrics collection and export for tenantguard.
//!
//! Provides Prometheus-compatible metrics for monitoring access decisions,
//! isolation violations, cross-tenant traffic, and token verification.

mod config;
mod recorder;

pub use config::MetricsConfig;
pub use recorder::SecurityMetrics;

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the metrics system with the given configuration.
///
/// Installs the Prometheus recorder globally; the scrape output is available
/// through [`render_metrics`] for whatever HTTP surface embeds this crate.
///
/// # Errors
///
/// Returns an error if the recorder cannot be installed or was already installed.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Err(MetricsError::Disabled);
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(recorder::RISK_SCORE.to_string()),
            &config.risk_buckets,
        )
        .map_err(|e| MetricsError::InitializationFailed(format!("{e}")))?
        .install_recorder()
        .map_err(|e| MetricsError::InitializationFailed(format!("{e}")))?;

    METRICS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::AlreadyInitialized)?;

    SecurityMetrics::register();

    Ok(())
}

/// Get the Prometheus metrics output as a string.
///
/// Returns an empty string if metrics have not been initialized.
#[must_use]
pub fn render_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Errors that can occur during metrics initialization.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Metrics disabled in configuration
    #[error("Metrics disabled by configuration")]
    Disabled,

    /// Metrics already initialized
    #[error("Metrics system already initialized")]
    AlreadyInitialized,

    /// Initialization failed
    #[error("Metrics initialization failed: {0}")]
    InitializationFailed(String),
}
