//! Per-tenant security boundary.

use super::matrix::AccessControlMatrix;
use crate::context::{DataClassification, IsolationLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Encryption obligations of a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct EncryptionRequirements {
    /// Data at rest is encrypted.
    pub at_rest: bool,
    /// Data in transit is encrypted.
    pub in_transit: bool,
    /// Data in memory is encrypted.
    pub in_memory: bool,
    /// Key rotation interval.
    pub key_rotation_days: u32,
    /// AEAD algorithm name.
    pub algorithm: String,
}

impl Default for EncryptionRequirements {
    fn default() -> Self {
        Self {
            at_rest: true,
            in_transit: true,
            in_memory: false,
            key_rotation_days: 90,
            algorithm: "AES-256-GCM".to_string(),
        }
    }
}

/// Security boundary of one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSecurityBoundary {
    /// Owning tenant.
    pub tenant_id: String,
    /// Tenants reachable cross-tenant. Empty means "any, subject to policy".
    #[serde(default)]
    pub allowed_tenants: Vec<String>,
    /// Denied operation names or `resource:operation` pairs.
    #[serde(default)]
    pub restricted_operations: Vec<String>,
    /// Classification assumed when a request carries none.
    pub default_classification: DataClassification,
    /// Isolation assumed when a context carries none.
    pub default_isolation: IsolationLevel,
    /// Encryption obligations.
    #[serde(default)]
    pub encryption: EncryptionRequirements,
    /// Access-control matrix.
    #[serde(default)]
    pub matrix: AccessControlMatrix,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last administrative change.
    pub updated_at: DateTime<Utc>,
}

impl TenantSecurityBoundary {
    /// The strict default boundary created lazily on first access.
    #[must_use]
    pub fn strict_default(tenant_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            allowed_tenants: Vec::new(),
            restricted_operations: Vec::new(),
            default_classification: DataClassification::Internal,
            default_isolation: IsolationLevel::Strict,
            encryption: EncryptionRequirements::default(),
            matrix: AccessControlMatrix::commerce_default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if `target` may be reached cross-tenant from this boundary.
    #[must_use]
    pub fn allows_target(&self, target: &str) -> bool {
        self.allowed_tenants.is_empty() || self.allowed_tenants.iter().any(|t| t == target)
    }

    /// Returns true if an operation name or `resource:operation` pair is restricted.
    #[must_use]
    pub fn is_restricted(&self, operation: &str) -> bool {
        self.restricted_operations.iter().any(|r| r == operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_default() {
        let boundary = TenantSecurityBoundary::strict_default("t1", Utc::now());
        assert_eq!(boundary.default_isolation, IsolationLevel::Strict);
        assert_eq!(boundary.default_classification, DataClassification::Internal);
        assert_eq!(boundary.encryption.key_rotation_days, 90);
        assert_eq!(boundary.encryption.algorithm, "AES-256-GCM");
        assert!(!boundary.encryption.in_memory);
    }

    #[test]
    fn test_allowed_targets() {
        let mut boundary = TenantSecurityBoundary::strict_default("t1", Utc::now());
        assert!(boundary.allows_target("t2"));

        boundary.allowed_tenants = vec!["t3".to_string()];
        assert!(!boundary.allows_target("t2"));
        assert!(boundary.allows_target("t3"));
    }

    #[test]
    fn test_restricted_operations() {
        let mut boundary = TenantSecurityBoundary::strict_default("t1", Utc::now());
        boundary.restricted_operations = vec!["data_export".to_string(), "order:delete".to_string()];
        assert!(boundary.is_restricted("data_export"));
        assert!(boundary.is_restricted("order:delete"));
        assert!(!boundary.is_restricted("order:read"));
    }
}
