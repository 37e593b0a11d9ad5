//! Security core configuration.

use super::error::ConfigError;
use super::secret::SecretString;
use super::traits::{Configurable, Validatable};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Minimum HMAC secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Top-level configuration for the tenant security core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Audit trail settings.
    #[serde(default)]
    pub audit: AuditSettings,
    /// Access decision settings.
    #[serde(default)]
    pub access: AccessSettings,
    /// Suspicious activity thresholds.
    #[serde(default)]
    pub activity: ActivitySettings,
    /// Security token settings.
    #[serde(default)]
    pub tokens: TokenSettings,
    /// Payload encryption settings.
    #[serde(default)]
    pub encryption: EncryptionSettings,
}

impl SecurityConfig {
    /// Returns a default config carrying the given token secret and hex master key.
    #[must_use]
    pub fn with_secrets(token_secret: impl Into<String>, master_key_hex: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.tokens.secret = SecretString::new(token_secret);
        config.encryption.master_key = SecretString::new(master_key_hex);
        config
    }
}

/// Audit trail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    /// Maximum retained entries; the oldest is evicted beyond this.
    pub capacity: usize,
    /// Optional key enabling the HMAC seal chain over entries.
    pub sealing_key: Option<SecretString>,
    /// Whether every entry is also emitted as a tracing event.
    pub forward_to_log: bool,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            capacity: 100_000,
            sealing_key: None,
            forward_to_log: true,
        }
    }
}

/// Access decision settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessSettings {
    /// Lifetime of a cached permission decision.
    pub cache_ttl_secs: u64,
    /// Violations per (tenant, user) after which a critical alert is raised.
    pub violation_alert_threshold: u32,
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            violation_alert_threshold: 5,
        }
    }
}

impl AccessSettings {
    /// Cache TTL as a duration.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::seconds(i64::try_from(self.cache_ttl_secs).unwrap_or(i64::MAX / 1000))
    }
}

/// Suspicious activity thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivitySettings {
    /// Sliding window over which request history is retained.
    pub window_secs: u64,
    /// Two switches closer than this count as consecutive.
    pub switch_window_secs: u64,
    /// More consecutive switches than this is suspicious.
    pub max_consecutive_switches: u32,
    /// This many requests inside the window is suspicious.
    pub max_requests_per_window: usize,
    /// More distinct target tenants than this inside the window is suspicious.
    pub max_distinct_targets: usize,
}

impl Default for ActivitySettings {
    fn default() -> Self {
        Self {
            window_secs: 3600,
            switch_window_secs: 300,
            max_consecutive_switches: 3,
            max_requests_per_window: 10,
            max_distinct_targets: 5,
        }
    }
}

impl ActivitySettings {
    /// History window as a duration.
    #[must_use]
    pub fn window(&self) -> Duration {
        secs(self.window_secs)
    }

    /// Consecutive switch window as a duration.
    #[must_use]
    pub fn switch_window(&self) -> Duration {
        secs(self.switch_window_secs)
    }
}

/// Security token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    /// HMAC-SHA256 signing secret.
    pub secret: SecretString,
    /// Token lifetime.
    pub ttl_secs: u64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            secret: SecretString::default(),
            ttl_secs: 3600,
        }
    }
}

impl TokenSettings {
    /// Token lifetime as a duration.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        secs(self.ttl_secs)
    }
}

/// Payload encryption settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionSettings {
    /// Hex-encoded 256-bit master key.
    pub master_key: SecretString,
    /// Identifier recorded on every payload sealed with the master key.
    pub key_id: String,
}

impl Default for EncryptionSettings {
    fn default() -> Self {
        Self {
            master_key: SecretString::default(),
            key_id: "primary".to_string(),
        }
    }
}

fn secs(value: u64) -> Duration {
    Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX / 1000))
}

impl Validatable for SecurityConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.audit.capacity == 0 {
            return Err(ConfigError::invalid_value(
                "audit.capacity",
                "must be greater than 0",
            ));
        }
        if let Some(key) = &self.audit.sealing_key
            && key.len() < MIN_SECRET_LEN
        {
            return Err(ConfigError::invalid_value(
                "audit.sealing_key",
                format!("must be at least {MIN_SECRET_LEN} bytes"),
            ));
        }

        if self.access.cache_ttl_secs == 0 {
            return Err(ConfigError::invalid_value(
                "access.cache_ttl_secs",
                "must be greater than 0",
            ));
        }
        if self.access.violation_alert_threshold == 0 {
            return Err(ConfigError::invalid_value(
                "access.violation_alert_threshold",
                "must be greater than 0",
            ));
        }

        let activity = &self.activity;
        if activity.switch_window_secs == 0 {
            return Err(ConfigError::invalid_value(
                "activity.switch_window_secs",
                "must be greater than 0",
            ));
        }
        if activity.window_secs < activity.switch_window_secs {
            return Err(ConfigError::invalid_value(
                "activity.window_secs",
                "must not be shorter than activity.switch_window_secs",
            ));
        }
        if activity.max_requests_per_window == 0 {
            return Err(ConfigError::invalid_value(
                "activity.max_requests_per_window",
                "must be greater than 0",
            ));
        }

        if self.tokens.secret.is_empty() {
            return Err(ConfigError::missing_field("tokens.secret"));
        }
        if self.tokens.secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::invalid_value(
                "tokens.secret",
                format!("must be at least {MIN_SECRET_LEN} bytes"),
            ));
        }
        if self.tokens.ttl_secs == 0 {
            return Err(ConfigError::invalid_value(
                "tokens.ttl_secs",
                "must be greater than 0",
            ));
        }

        if self.encryption.master_key.is_empty() {
            return Err(ConfigError::missing_field("encryption.master_key"));
        }
        match hex::decode(self.encryption.master_key.expose()) {
            Ok(bytes) if bytes.len() == 32 => {}
            Ok(_) => {
                return Err(ConfigError::invalid_value(
                    "encryption.master_key",
                    "must decode to exactly 32 bytes",
                ));
            }
            Err(_) => {
                return Err(ConfigError::invalid_value(
                    "encryption.master_key",
                    "must be hex encoded",
                ));
            }
        }
        if self.encryption.key_id.trim().is_empty() {
            return Err(ConfigError::missing_field("encryption.key_id"));
        }

        Ok(())
    }
}

impl Configurable for SecurityConfig {
    fn apply_overrides<F>(&mut self, prefix: &str, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{prefix}_{name}"));

        if let Some(v) = var("AUDIT_CAPACITY").and_then(|v| v.parse().ok()) {
            self.audit.capacity = v;
        }
        if let Some(v) = var("AUDIT_SEALING_KEY") {
            self.audit.sealing_key = Some(SecretString::new(v));
        }
        if let Some(v) = var("AUDIT_FORWARD_TO_LOG").and_then(|v| v.parse().ok()) {
            self.audit.forward_to_log = v;
        }
        if let Some(v) = var("ACCESS_CACHE_TTL_SECS").and_then(|v| v.parse().ok()) {
            self.access.cache_ttl_secs = v;
        }
        if let Some(v) = var("ACCESS_VIOLATION_ALERT_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.access.violation_alert_threshold = v;
        }
        if let Some(v) = var("ACTIVITY_WINDOW_SECS").and_then(|v| v.parse().ok()) {
            self.activity.window_secs = v;
        }
        if let Some(v) = var("ACTIVITY_SWITCH_WINDOW_SECS").and_then(|v| v.parse().ok()) {
            self.activity.switch_window_secs = v;
        }
        if let Some(v) = var("TOKENS_SECRET") {
            self.tokens.secret = SecretString::new(v);
        }
        if let Some(v) = var("TOKENS_TTL_SECS").and_then(|v| v.parse().ok()) {
            self.tokens.ttl_secs = v;
        }
        if let Some(v) = var("ENCRYPTION_MASTER_KEY") {
            self.encryption.master_key = SecretString::new(v);
        }
        if let Some(v) = var("ENCRYPTION_KEY_ID") {
            self.encryption.key_id = v;
        }
    }

    fn env_var_names(prefix: &str) -> Vec<String> {
        [
            "AUDIT_CAPACITY",
            "AUDIT_SEALING_KEY",
            "AUDIT_FORWARD_TO_LOG",
            "ACCESS_CACHE_TTL_SECS",
            "ACCESS_VIOLATION_ALERT_THRESHOLD",
            "ACTIVITY_WINDOW_SECS",
            "ACTIVITY_SWITCH_WINDOW_SECS",
            "TOKENS_SECRET",
            "TOKENS_TTL_SECS",
            "ENCRYPTION_MASTER_KEY",
            "ENCRYPTION_KEY_ID",
        ]
        .iter()
        .map(|name| format!("{prefix}_{name}"))
        .collect()
    }
}
