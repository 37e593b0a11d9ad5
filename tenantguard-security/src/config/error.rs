//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file '{path}': {reason}")]
    FileReadError {
        /// Path of the file.
        path: String,
        /// Underlying I/O error.
        reason: String,
    },

    /// The content could not be parsed or the format is unknown.
    #[error("Invalid config format in '{path}': {reason}")]
    InvalidFormat {
        /// Path or pseudo-path of the content.
        path: String,
        /// Parser message.
        reason: String,
    },

    /// A field holds a value outside its allowed range.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Dotted field path.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A required field is missing or empty.
    #[error("Missing required field: {field}")]
    MissingField {
        /// Dotted field path.
        field: String,
    },
}

impl ConfigError {
    /// Creates a new invalid value error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new missing field error.
    #[must_use]
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}
