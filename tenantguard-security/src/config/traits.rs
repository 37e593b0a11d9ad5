//! Configuration traits for validation and environment overrides.

use super::error::ConfigError;

/// Trait for types that can be validated.
pub trait Validatable {
    /// Validates the configuration.
    ///
    /// Returns `Ok(())` if the configuration is valid, or a `ConfigError`
    /// describing the first invalid field.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Trait for types that support environment variable overrides.
///
/// Implementors read overrides through a lookup function so the same code
/// path serves the process environment and explicit override maps.
pub trait Configurable: Sized {
    /// Applies overrides from `lookup` using variables named `{prefix}_{SECTION}_{FIELD}`.
    fn apply_overrides<F>(&mut self, prefix: &str, lookup: F)
    where
        F: Fn(&str) -> Option<String>;

    /// Returns the variable names that can override this configuration.
    fn env_var_names(prefix: &str) -> Vec<String>;

    /// Applies overrides from the process environment.
    fn apply_env_overrides(&mut self, prefix: &str) {
        self.apply_overrides(prefix, |name| std::env::var(name).ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct PortConfig {
        port: u16,
    }

    impl Validatable for PortConfig {
        fn validate(&self) -> Result<(), ConfigError> {
            if self.port == 0 {
                return Err(ConfigError::invalid_value("port", "Port cannot be 0"));
            }
            Ok(())
        }
    }

    impl Configurable for PortConfig {
        fn apply_overrides<F>(&mut self, prefix: &str, lookup: F)
        where
            F: Fn(&str) -> Option<String>,
        {
            if let Some(port) = lookup(&format!("{prefix}_PORT")).and_then(|v| v.parse().ok()) {
                self.port = port;
            }
        }

        fn env_var_names(prefix: &str) -> Vec<String> {
            vec![format!("{prefix}_PORT")]
        }
    }

    #[test]
    fn test_validatable() {
        assert!(PortConfig { port: 80 }.validate().is_ok());
        let err = PortConfig { port: 0 }.validate().unwrap_err();
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_overrides_from_map() {
        let vars = HashMap::from([("APP_PORT".to_string(), "8443".to_string())]);
        let mut config = PortConfig { port: 80 };
        config.apply_overrides("APP", |name| vars.get(name).cloned());
        assert_eq!(config.port, 8443);
        assert_eq!(PortConfig::env_var_names("APP"), vec!["APP_PORT"]);
    }
}
