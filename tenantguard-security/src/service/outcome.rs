//! Request and outcome types of the security service.

use crate::context::{DataClassification, DataOperation, TenantSecurityContext};
use crate::crypto::EncryptedPayload;
use crate::risk::RiskScore;
use crate::token::SecurityTokenClaims;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A request to access tenant data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataAccessRequest {
    /// Resource identifier.
    pub resource_id: String,
    /// Resource type, looked up in the access-control matrix.
    pub resource_type: String,
    /// Requested operation.
    pub operation: DataOperation,
    /// Classification of the data; the resource policy's applies when unset.
    #[serde(default)]
    pub classification: Option<DataClassification>,
    /// Payload to encrypt when the resource requires encryption.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    /// Fields touched by the request, recorded in the audit trail.
    #[serde(default)]
    pub data_fields: Vec<String>,
}

impl DataAccessRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(
        resource_id: impl Into<String>,
        resource_type: impl Into<String>,
        operation: DataOperation,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            resource_type: resource_type.into(),
            operation,
            classification: None,
            payload: None,
            data_fields: Vec::new(),
        }
    }

    /// Sets the data classification.
    #[must_use]
    pub const fn with_classification(mut self, classification: DataClassification) -> Self {
        self.classification = Some(classification);
        self
    }

    /// Attaches a payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Records the fields touched by the request.
    #[must_use]
    pub fn with_data_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

/// Result of [`enforce_data_access`](super::TenantSecurityService::enforce_data_access).
#[derive(Debug, Clone, Serialize)]
pub struct DataAccessOutcome {
    /// Whether access was granted.
    pub allowed: bool,
    /// The validated context, absent when validation failed.
    pub security: Option<TenantSecurityContext>,
    /// Reason for a denial.
    pub error: Option<String>,
    /// The encrypted payload, when one was supplied and encryption applied.
    pub encrypted_data: Option<EncryptedPayload>,
    /// Risk recorded for the decision.
    pub risk_score: RiskScore,
    /// Whether the denial was an isolation violation.
    pub isolation_violation: bool,
    /// Id of the audit entry written for the decision.
    pub audit_entry_id: Option<Uuid>,
}

/// A request to reach another tenant's data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossTenantRequest {
    /// Tenant the request originates from.
    pub source_tenant: String,
    /// Tenant whose data is requested.
    pub target_tenant: String,
    /// Operation name, looked up in the operation policies.
    pub operation: String,
    /// Free-text justification.
    #[serde(default)]
    pub justification: Option<String>,
    /// Caller's own approval requirement.
    #[serde(default)]
    pub requires_approval: bool,
}

impl CrossTenantRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(
        source_tenant: impl Into<String>,
        target_tenant: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            source_tenant: source_tenant.into(),
            target_tenant: target_tenant.into(),
            operation: operation.into(),
            justification: None,
            requires_approval: false,
        }
    }

    /// Sets the justification.
    #[must_use]
    pub fn with_justification(mut self, justification: impl Into<String>) -> Self {
        self.justification = Some(justification.into());
        self
    }

    /// Marks the request as requiring approval.
    #[must_use]
    pub const fn with_approval(mut self) -> Self {
        self.requires_approval = true;
        self
    }
}

/// Result of [`validate_cross_tenant_access`](super::TenantSecurityService::validate_cross_tenant_access).
#[derive(Debug, Clone, Serialize)]
pub struct CrossTenantOutcome {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// The validated context, absent when validation failed.
    pub security: Option<TenantSecurityContext>,
    /// Reason for a denial.
    pub error: Option<String>,
    /// Whether the request needs approval before it proceeds.
    pub requires_approval: bool,
    /// Whether the user's activity was flagged.
    pub suspicious: bool,
    /// Risk recorded for the decision.
    pub risk_score: RiskScore,
    /// Id of the audit entry written for the decision.
    pub audit_entry_id: Option<Uuid>,
}

/// Result of token verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenVerification {
    /// Whether the token verified.
    pub valid: bool,
    /// Claims of a valid token.
    pub claims: Option<SecurityTokenClaims>,
    /// Reason for a rejection.
    pub error: Option<String>,
}

/// Aggregates of a tenant's retained audit entries.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TenantSecuritySummary {
    pub tenant_id: String,
    pub total_entries: usize,
    pub granted: usize,
    pub denied: usize,
    pub isolation_violations: usize,
    pub suspicious_events: usize,
    pub critical_alerts: usize,
    /// Mean risk score, 0.0 when nothing is retained.
    pub average_risk: f64,
}
