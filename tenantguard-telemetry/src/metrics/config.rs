//! Metrics configuration types.

use serde::{Deserialize, Serialize};

/// Configuration for the metrics system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Histogram buckets for the risk score distribution (0-10 scale)
    #[serde(default = "default_risk_buckets")]
    pub risk_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            risk_buckets: default_risk_buckets(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_risk_buckets() -> Vec<f64> {
    vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]
}
