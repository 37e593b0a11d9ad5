//! Security error types.
//!
//! Errors are grouped along the decision taxonomy of the security core:
//! context validation, isolation, access control, suspicious activity,
//! encryption, and token verification. Storage and configuration failures
//! complete the set.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Security-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityError {
    /// The request context is missing or carries malformed identifiers.
    #[error("Invalid security context: {reason}")]
    InvalidContext {
        /// What was wrong with the context.
        reason: String,
    },

    /// A resource was accessed across a tenant isolation boundary.
    #[error("Tenant isolation violation: {reason}")]
    IsolationViolation {
        /// Reason for the violation.
        reason: String,
    },

    /// The requester lacks the permissions for the operation.
    #[error("Access denied for user '{user}': {reason}")]
    AccessDenied {
        /// User who attempted the action.
        user: String,
        /// Why access was refused.
        reason: String,
    },

    /// Cross-tenant activity crossed a suspicion threshold.
    #[error("Suspicious activity detected for user '{user}': {reason}")]
    SuspiciousActivity {
        /// User whose activity was flagged.
        user: String,
        /// Which threshold tripped.
        reason: String,
    },

    /// Encryption failed.
    #[error("Encryption error: {reason}")]
    Encryption {
        /// Reason for the encryption failure.
        reason: String,
    },

    /// Decryption or authentication of ciphertext failed.
    #[error("Decryption error: {reason}")]
    Decryption {
        /// Reason for the decryption failure.
        reason: String,
    },

    /// Encryption key not present in the keyring.
    #[error("Encryption key not found: {key_id}")]
    KeyNotFound {
        /// Identifier of the missing key.
        key_id: String,
    },

    /// Token does not have the expected structure.
    #[error("Malformed security token: {reason}")]
    TokenMalformed {
        /// What could not be parsed.
        reason: String,
    },

    /// Token expired.
    #[error("Security token expired")]
    TokenExpired,

    /// Token signature does not match its payload.
    #[error("Security token signature mismatch")]
    TokenSignatureMismatch,

    /// Storage backend failure.
    #[error("Storage error: {reason}")]
    Storage {
        /// Reason for the storage error.
        reason: String,
    },

    /// Configuration error.
    #[error("Configuration error: {reason}")]
    Configuration {
        /// Reason for the configuration error.
        reason: String,
    },
}

impl SecurityError {
    /// Creates a new invalid context error.
    #[must_use]
    pub fn invalid_context(reason: impl Into<String>) -> Self {
        Self::InvalidContext {
            reason: reason.into(),
        }
    }

    /// Creates a new isolation violation error.
    #[must_use]
    pub fn isolation_violation(reason: impl Into<String>) -> Self {
        Self::IsolationViolation {
            reason: reason.into(),
        }
    }

    /// Creates a new access denied error.
    #[must_use]
    pub fn access_denied(user: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            user: user.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new suspicious activity error.
    #[must_use]
    pub fn suspicious_activity(user: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SuspiciousActivity {
            user: user.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new encryption error.
    #[must_use]
    pub fn encryption(reason: impl Into<String>) -> Self {
        Self::Encryption {
            reason: reason.into(),
        }
    }

    /// Creates a new decryption error.
    #[must_use]
    pub fn decryption(reason: impl Into<String>) -> Self {
        Self::Decryption {
            reason: reason.into(),
        }
    }

    /// Creates a new key not found error.
    #[must_use]
    pub fn key_not_found(key_id: impl Into<String>) -> Self {
        Self::KeyNotFound {
            key_id: key_id.into(),
        }
    }

    /// Creates a new malformed token error.
    #[must_use]
    pub fn token_malformed(reason: impl Into<String>) -> Self {
        Self::TokenMalformed {
            reason: reason.into(),
        }
    }

    /// Creates a new storage error.
    #[must_use]
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
        }
    }

    /// Creates a new configuration error.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Returns true if this error came from token verification.
    #[must_use]
    pub const fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::TokenMalformed { .. } | Self::TokenExpired | Self::TokenSignatureMismatch
        )
    }

    /// Returns true if this error is related to cryptography.
    #[must_use]
    pub const fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            Self::Encryption { .. } | Self::Decryption { .. } | Self::KeyNotFound { .. }
        )
    }

    /// Returns true if this error is a tenant boundary error.
    #[must_use]
    pub const fn is_tenant_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidContext { .. } | Self::IsolationViolation { .. }
        )
    }

    /// Returns true if this error is an access decision error.
    #[must_use]
    pub const fn is_access_error(&self) -> bool {
        matches!(
            self,
            Self::AccessDenied { .. } | Self::SuspiciousActivity { .. }
        )
    }

    /// Short machine-readable label, used as a metric label value.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidContext { .. } => "invalid_context",
            Self::IsolationViolation { .. } => "isolation_violation",
            Self::AccessDenied { .. } => "access_denied",
            Self::SuspiciousActivity { .. } => "suspicious_activity",
            Self::Encryption { .. } => "encryption",
            Self::Decryption { .. } => "decryption",
            Self::KeyNotFound { .. } => "key_not_found",
            Self::TokenMalformed { .. } => "malformed",
            Self::TokenExpired => "expired",
            Self::TokenSignatureMismatch => "signature",
            Self::Storage { .. } => "storage",
            Self::Configuration { .. } => "configuration",
        }
    }
}

/// A specialized Result type for security operations.
pub type Result<T> = std::result::Result<T, SecurityError>;
