//! Audit entry definitions.

#![allow(missing_docs)]

use crate::context::{Role, TenantSecurityContext};
use crate::risk::RiskScore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Kinds of audited security events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    /// A data access was allowed.
    TenantAccessGranted,
    /// A data access was refused.
    TenantAccessDenied,
    /// A resource was reached across an isolation boundary.
    IsolationBoundaryViolated,
    /// A cross-tenant request was refused.
    CrossTenantAccessAttempted,
    /// A cross-tenant request was allowed.
    CrossTenantAccessGranted,
    /// Cross-tenant activity crossed a suspicion threshold.
    SuspiciousActivityDetected,
    /// Repeated violations escalated to an alert.
    CriticalSecurityAlert,
    /// Tenant data was encrypted.
    DataEncrypted,
    /// Tenant data was decrypted.
    DataDecrypted,
    /// Encryption or decryption failed.
    EncryptionFailed,
    /// A security token was issued.
    SecurityTokenIssued,
    /// A security token failed verification.
    SecurityTokenRejected,
}

impl AuditEventKind {
    /// Wire name of the event kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TenantAccessGranted => "tenant_access_granted",
            Self::TenantAccessDenied => "tenant_access_denied",
            Self::IsolationBoundaryViolated => "isolation_boundary_violated",
            Self::CrossTenantAccessAttempted => "cross_tenant_access_attempted",
            Self::CrossTenantAccessGranted => "cross_tenant_access_granted",
            Self::SuspiciousActivityDetected => "suspicious_activity_detected",
            Self::CriticalSecurityAlert => "critical_security_alert",
            Self::DataEncrypted => "data_encrypted",
            Self::DataDecrypted => "data_decrypted",
            Self::EncryptionFailed => "encryption_failed",
            Self::SecurityTokenIssued => "security_token_issued",
            Self::SecurityTokenRejected => "security_token_rejected",
        }
    }
}

impl fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of an audited event.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    /// Score 0 to 3.
    #[default]
    Low,
    /// Score 4 to 6.
    Medium,
    /// Score 7 or 8.
    High,
    /// Score 9 or 10.
    Critical,
}

impl SecurityLevel {
    /// Maps a risk score to a severity.
    #[must_use]
    pub const fn from_score(score: RiskScore) -> Self {
        match score.value() {
            0..=3 => Self::Low,
            4..=6 => Self::Medium,
            7..=8 => Self::High,
            _ => Self::Critical,
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// An immutable record of one security decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantAuditEntry {
    id: Uuid,
    timestamp: DateTime<Utc>,
    kind: AuditEventKind,
    tenant_id: String,
    user_id: String,
    role: Option<Role>,
    session_id: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    operation: String,
    resource_id: Option<String>,
    resource_type: Option<String>,
    success: bool,
    security_level: SecurityLevel,
    isolation_violation: bool,
    data_fields: Option<Vec<String>>,
    error_message: Option<String>,
    risk_score: RiskScore,
    metadata: BTreeMap<String, serde_json::Value>,
}

impl TenantAuditEntry {
    /// Starts building an entry.
    #[must_use]
    pub fn builder(
        kind: AuditEventKind,
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        operation: impl Into<String>,
    ) -> AuditEntryBuilder {
        AuditEntryBuilder {
            kind,
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            operation: operation.into(),
            role: None,
            session_id: None,
            ip_address: None,
            user_agent: None,
            resource_id: None,
            resource_type: None,
            success: false,
            security_level: None,
            isolation_violation: false,
            data_fields: None,
            error_message: None,
            risk_score: RiskScore::MIN,
            metadata: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub const fn kind(&self) -> AuditEventKind {
        self.kind
    }

    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        self.role
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    #[must_use]
    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    #[must_use]
    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    #[must_use]
    pub fn resource_type(&self) -> Option<&str> {
        self.resource_type.as_deref()
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        self.success
    }

    #[must_use]
    pub const fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    #[must_use]
    pub const fn isolation_violation(&self) -> bool {
        self.isolation_violation
    }

    #[must_use]
    pub fn data_fields(&self) -> Option<&[String]> {
        self.data_fields.as_deref()
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    #[must_use]
    pub const fn risk_score(&self) -> RiskScore {
        self.risk_score
    }

    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    /// Deterministic JSON encoding used for sealing.
    ///
    /// # Errors
    ///
    /// Returns an error if a metadata value cannot be serialized.
    pub fn canonical_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Builder for [`TenantAuditEntry`].
#[derive(Debug, Clone)]
pub struct AuditEntryBuilder {
    kind: AuditEventKind,
    tenant_id: String,
    user_id: String,
    operation: String,
    role: Option<Role>,
    session_id: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    resource_id: Option<String>,
    resource_type: Option<String>,
    success: bool,
    security_level: Option<SecurityLevel>,
    isolation_violation: bool,
    data_fields: Option<Vec<String>>,
    error_message: Option<String>,
    risk_score: RiskScore,
    metadata: BTreeMap<String, serde_json::Value>,
}

impl AuditEntryBuilder {
    /// Copies role, session and client details from a validated context.
    #[must_use]
    pub fn context(mut self, context: &TenantSecurityContext) -> Self {
        self.role = Some(context.role);
        self.session_id = Some(context.session_id.clone());
        self.ip_address.clone_from(&context.ip_address);
        self.user_agent.clone_from(&context.user_agent);
        self
    }

    /// Replaces the event kind, e.g. when a check fails after the entry was started.
    #[must_use]
    pub const fn kind(mut self, kind: AuditEventKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn resource(mut self, resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    #[must_use]
    pub const fn success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    #[must_use]
    pub const fn isolation_violation(mut self, violation: bool) -> Self {
        self.isolation_violation = violation;
        self
    }

    #[must_use]
    pub fn data_fields(mut self, fields: Vec<String>) -> Self {
        self.data_fields = Some(fields);
        self
    }

    #[must_use]
    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Sets the risk score; the security level follows it unless overridden.
    #[must_use]
    pub const fn risk(mut self, score: RiskScore) -> Self {
        self.risk_score = score;
        self
    }

    /// Overrides the severity derived from the risk score.
    #[must_use]
    pub const fn security_level(mut self, level: SecurityLevel) -> Self {
        self.security_level = Some(level);
        self
    }

    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Finishes the entry with a fresh id.
    #[must_use]
    pub fn build(self, timestamp: DateTime<Utc>) -> TenantAuditEntry {
        TenantAuditEntry {
            id: Uuid::new_v4(),
            timestamp,
            kind: self.kind,
            tenant_id: self.tenant_id,
            user_id: self.user_id,
            role: self.role,
            session_id: self.session_id,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            operation: self.operation,
            resource_id: self.resource_id,
            resource_type: self.resource_type,
            success: self.success,
            security_level: self
                .security_level
                .unwrap_or_else(|| SecurityLevel::from_score(self.risk_score)),
            isolation_violation: self.isolation_violation,
            data_fields: self.data_fields,
            error_message: self.error_message,
            risk_score: self.risk_score,
            metadata: self.metadata,
        }
    }
}
