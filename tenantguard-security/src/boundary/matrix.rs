//! Access-control matrix: role grants, resource policies, operation policies.

use crate::context::{DataClassification, IsolationLevel, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Risk tier attached to an operation policy.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Low risk.
    #[default]
    Low,
    /// Medium risk.
    Medium,
    /// High risk; approval required.
    High,
    /// Critical risk; approval required.
    Critical,
}

impl RiskLevel {
    /// Returns true for `High` and `Critical`.
    #[must_use]
    pub const fn is_elevated(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Resource types whose payloads are always encrypted, whatever the matrix says.
pub const ENCRYPTED_RESOURCE_TYPES: [&str; 3] = ["payment", "customer", "sensitive"];

/// Returns true if payloads of `resource_type` are always encrypted.
#[must_use]
pub fn resource_type_requires_encryption(resource_type: &str) -> bool {
    ENCRYPTED_RESOURCE_TYPES.contains(&resource_type)
}

/// Policy applied to every access of one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePolicy {
    /// Sensitivity of the resource type.
    pub classification: DataClassification,
    /// Permissions required in addition to the operation grant.
    #[serde(default)]
    pub required_permissions: Vec<String>,
    /// Isolation the resource demands of the requester.
    pub isolation_level: IsolationLevel,
    /// Whether payloads of this type are encrypted on access.
    pub encryption_required: bool,
}

impl ResourcePolicy {
    /// Policy for resource types missing from the matrix.
    #[must_use]
    pub fn deny_leaning() -> Self {
        Self {
            classification: DataClassification::Restricted,
            required_permissions: Vec::new(),
            isolation_level: IsolationLevel::Strict,
            encryption_required: true,
        }
    }

    fn new(
        classification: DataClassification,
        isolation_level: IsolationLevel,
        encryption_required: bool,
        required: &[&str],
    ) -> Self {
        Self {
            classification,
            required_permissions: required.iter().map(ToString::to_string).collect(),
            isolation_level,
            encryption_required,
        }
    }
}

/// Policy applied to a named operation, notably cross-tenant ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationPolicy {
    /// Lowest role allowed to perform the operation.
    pub minimum_role: Role,
    /// Whether a granted request still needs human approval.
    pub requires_approval: bool,
    /// Whether the operation must be audited.
    pub audit_required: bool,
    /// Risk tier.
    pub risk_level: RiskLevel,
    /// Whether the operation may target another tenant.
    pub cross_tenant_allowed: bool,
}

impl OperationPolicy {
    /// Policy for operation names missing from the matrix.
    #[must_use]
    pub const fn conservative() -> Self {
        Self {
            minimum_role: Role::Admin,
            requires_approval: true,
            audit_required: true,
            risk_level: RiskLevel::High,
            cross_tenant_allowed: false,
        }
    }

    const fn new(
        minimum_role: Role,
        requires_approval: bool,
        risk_level: RiskLevel,
        cross_tenant_allowed: bool,
    ) -> Self {
        Self {
            minimum_role,
            requires_approval,
            audit_required: true,
            risk_level,
            cross_tenant_allowed,
        }
    }
}

/// Per-tenant mapping from roles, resources and operations to rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlMatrix {
    /// Permissions every holder of a role receives.
    #[serde(default)]
    pub roles: HashMap<Role, Vec<String>>,
    /// Policies by resource type.
    #[serde(default)]
    pub resources: HashMap<String, ResourcePolicy>,
    /// Policies by operation name.
    #[serde(default)]
    pub operations: HashMap<String, OperationPolicy>,
}

impl AccessControlMatrix {
    /// The standard commerce matrix installed on every new tenant.
    #[must_use]
    pub fn commerce_default() -> Self {
        use DataClassification as C;
        use IsolationLevel as I;

        let grants = |perms: &[&str]| perms.iter().map(ToString::to_string).collect::<Vec<_>>();
        let roles = HashMap::from([
            (Role::User, grants(&["product:read"])),
            (
                Role::Admin,
                grants(&["product:*", "order:*", "report:read", "customer:read"]),
            ),
            (Role::SuperAdmin, grants(&["*:*"])),
        ]);

        let resources = HashMap::from([
            ("cart".to_string(), ResourcePolicy::new(C::Internal, I::Strict, false, &[])),
            ("order".to_string(), ResourcePolicy::new(C::Confidential, I::Strict, false, &[])),
            ("product".to_string(), ResourcePolicy::new(C::Public, I::Shared, false, &[])),
            (
                "customer".to_string(),
                ResourcePolicy::new(C::Confidential, I::Strict, true, &["customer:read"]),
            ),
            (
                "payment".to_string(),
                ResourcePolicy::new(C::Restricted, I::Strict, true, &["payment:read"]),
            ),
            (
                "sensitive".to_string(),
                ResourcePolicy::new(C::TopSecret, I::Strict, true, &["sensitive:read"]),
            ),
            ("report".to_string(), ResourcePolicy::new(C::Internal, I::Controlled, false, &[])),
        ]);

        let operations = HashMap::from([
            (
                "data_read".to_string(),
                OperationPolicy::new(Role::User, false, RiskLevel::Medium, true),
            ),
            (
                "data_export".to_string(),
                OperationPolicy::new(Role::Admin, true, RiskLevel::High, true),
            ),
            (
                "bulk_operation".to_string(),
                OperationPolicy::new(Role::Admin, true, RiskLevel::High, false),
            ),
            (
                "tenant_support".to_string(),
                OperationPolicy::new(Role::Admin, false, RiskLevel::Medium, true),
            ),
            (
                "user_management".to_string(),
                OperationPolicy::new(Role::Admin, false, RiskLevel::Medium, false),
            ),
        ]);

        Self {
            roles,
            resources,
            operations,
        }
    }

    /// Permissions granted by a role.
    #[must_use]
    pub fn role_permissions(&self, role: Role) -> &[String] {
        self.roles.get(&role).map_or(&[], Vec::as_slice)
    }

    /// Resolves a resource policy, falling back to [`ResourcePolicy::deny_leaning`].
    #[must_use]
    pub fn resource_policy(&self, resource_type: &str) -> ResourcePolicy {
        self.resources
            .get(resource_type)
            .cloned()
            .unwrap_or_else(ResourcePolicy::deny_leaning)
    }

    /// Resolves an operation policy, falling back to [`OperationPolicy::conservative`].
    #[must_use]
    pub fn operation_policy(&self, operation: &str) -> OperationPolicy {
        self.operations
            .get(operation)
            .cloned()
            .unwrap_or_else(OperationPolicy::conservative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_resource_falls_back_deny_leaning() {
        let matrix = AccessControlMatrix::commerce_default();
        let policy = matrix.resource_policy("warehouse");
        assert_eq!(policy.classification, DataClassification::Restricted);
        assert_eq!(policy.isolation_level, IsolationLevel::Strict);
        assert!(policy.encryption_required);
    }

    #[test]
    fn test_unknown_operation_is_conservative() {
        let matrix = AccessControlMatrix::commerce_default();
        let policy = matrix.operation_policy("drop_tenant");
        assert_eq!(policy.minimum_role, Role::Admin);
        assert!(!policy.cross_tenant_allowed);
        assert!(policy.requires_approval);
        assert_eq!(policy, OperationPolicy::conservative());
    }

    #[test]
    fn test_commerce_default_entries() {
        let matrix = AccessControlMatrix::commerce_default();
        for resource in ["cart", "order", "product", "customer", "payment", "sensitive", "report"] {
            assert!(matrix.resources.contains_key(resource), "{resource}");
        }
        assert!(matrix.resource_policy("payment").encryption_required);
        assert!(matrix.operation_policy("data_export").cross_tenant_allowed);
        assert!(!matrix.operation_policy("bulk_operation").cross_tenant_allowed);
        assert_eq!(matrix.role_permissions(Role::SuperAdmin), ["*:*".to_string()]);
    }

    #[test]
    fn test_encrypted_resource_types() {
        assert!(resource_type_requires_encryption("payment"));
        assert!(resource_type_requires_encryption("customer"));
        assert!(resource_type_requires_encryption("sensitive"));
        assert!(!resource_type_requires_encryption("cart"));
        assert!(!resource_type_requires_encryption("Payment"));
    }

    #[test]
    fn test_risk_level_elevated() {
        assert!(RiskLevel::High.is_elevated());
        assert!(RiskLevel::Critical.is_elevated());
        assert!(!RiskLevel::Medium.is_elevated());
    }

    #[test]
    fn test_matrix_serde() {
        let matrix = AccessControlMatrix::commerce_default();
        let json = serde_json::to_string(&matrix).unwrap();
        let parsed: AccessControlMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, matrix);
    }
}
