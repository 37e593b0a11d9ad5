//! Logging configuration types.

use serde::{Deserialize, Serialize};

/// Tracing target that audit entries are emitted under.
pub const AUDIT_TARGET: &str = "tenantguard::audit";

/// Configuration for the logging system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Base filter directive, e.g. "info" or "tenantguard=debug".
    #[serde(default = "default_level")]
    pub level: String,

    /// Level for forwarded audit entries, independent of `level`. Unset
    /// leaves them to the base directive.
    #[serde(default)]
    pub audit_level: Option<String>,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Sinks every event is written to.
    #[serde(default = "default_outputs")]
    pub outputs: Vec<LogOutput>,

    /// Record the source file and line of each event.
    #[serde(default)]
    pub include_source: bool,

    /// Mask credentials, tokens and card numbers in every written line.
    #[serde(default = "default_mask")]
    pub mask_sensitive: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            audit_level: None,
            format: LogFormat::default(),
            outputs: default_outputs(),
            include_source: false,
            mask_sensitive: default_mask(),
        }
    }
}

impl LogConfig {
    /// The filter directive built from `level` and `audit_level`.
    #[must_use]
    pub fn filter_directive(&self) -> String {
        match &self.audit_level {
            Some(audit) => format!("{},{AUDIT_TARGET}={audit}", self.level),
            None => self.level.clone(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_outputs() -> Vec<LogOutput> {
    vec![LogOutput::Stdout]
}

const fn default_mask() -> bool {
    true
}

fn default_file_prefix() -> String {
    "tenantguard.log".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line, for SIEM ingestion.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

/// Log sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output.
    Stdout,
    /// Rolling files in a directory.
    File {
        /// Directory, created if missing.
        path: String,
        /// File name prefix.
        #[serde(default = "default_file_prefix")]
        prefix: String,
        /// How often a new file is started.
        #[serde(default)]
        rotation: LogRotation,
    },
}

/// File rotation schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// A new file every hour.
    Hourly,
    /// A new file every day.
    #[default]
    Daily,
    /// A single file.
    Never,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_mask_and_use_json() {
        let config = LogConfig::default();
        assert_eq!(config.filter_directive(), "info");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.outputs, [LogOutput::Stdout]);
        assert!(config.mask_sensitive);
    }

    #[test]
    fn test_audit_level_added_to_directive() {
        let config = LogConfig {
            level: "warn".to_string(),
            audit_level: Some("info".to_string()),
            ..LogConfig::default()
        };
        assert_eq!(config.filter_directive(), "warn,tenantguard::audit=info");
    }

    #[test]
    fn test_file_output_defaults() {
        let json = r#"{
            "level": "tenantguard=debug",
            "format": "pretty",
            "outputs": [
                {"type": "stdout"},
                {"type": "file", "path": "/var/log/tenantguard"}
            ]
        }"#;

        let parsed: LogConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.format, LogFormat::Pretty);
        assert_eq!(
            parsed.outputs[1],
            LogOutput::File {
                path: "/var/log/tenantguard".to_string(),
                prefix: "tenantguard.log".to_string(),
                rotation: LogRotation::Daily,
            }
        );
        assert!(parsed.mask_sensitive);
        assert!(parsed.audit_level.is_none());
    }
}
