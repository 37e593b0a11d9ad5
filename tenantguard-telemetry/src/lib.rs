//! # Tenantguard Telemetry
//!
//! Logging, masking, and metrics for the tenantguard security core.
//!
//! This crate provides:
//! - Structured JSON logging through `tracing-subscriber`
//! - Stdout and rolling-file outputs
//! - Masking of credentials, tokens, and card numbers before they reach a sink
//! - Prometheus metrics for access decisions, violations, and token checks

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

/// Logging configuration and initialization
pub mod logging;

/// Sensitive data masking
pub mod masking;

/// Security decision metrics
pub mod metrics;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::logging::{LogConfig, LogFormat, LogOutput, init_logging};
    pub use crate::masking::{Sensitive, SensitiveDataMasker};
    pub use crate::metrics::{MetricsConfig, SecurityMetrics, init_metrics};
}
