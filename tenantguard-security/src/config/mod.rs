//! Configuration for the security core.
//!
//! Configuration is read from YAML, TOML or JSON, overlaid with environment
//! variables under a prefix (`TENANTGUARD_TOKENS_SECRET`, ...), and validated
//! before use. Secrets are held in [`SecretString`] and never printed.

mod error;
mod loader;
mod secret;
mod settings;
mod traits;

pub use error::ConfigError;
pub use loader::{ConfigFormat, ConfigLoader};
pub use secret::SecretString;
pub use settings::{
    AccessSettings, ActivitySettings, AuditSettings, EncryptionSettings, MIN_SECRET_LEN,
    SecurityConfig, TokenSettings,
};
pub use traits::{Configurable, Validatable};

/// Default environment variable prefix.
pub const ENV_PREFIX: &str = "TENANTGUARD";
