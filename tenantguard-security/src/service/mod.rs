//! Tenant security orchestration.
//!
//! [`TenantSecurityService`] is the single entry point consumed by request
//! handlers. Each public decision validates the request context, evaluates
//! its checks in a fixed order, and appends exactly one audit entry before
//! returning a structured outcome. Failures never escape as errors.

mod outcome;
#[cfg(test)]
mod tests;

pub use outcome::{
    CrossTenantOutcome, CrossTenantRequest, DataAccessOutcome, DataAccessRequest,
    TenantSecuritySummary, TokenVerification,
};

use crate::access::AccessController;
use crate::activity::{ActivityStore, CrossTenantRequestRecord, InMemoryActivityStore};
use crate::audit::{
    AuditEntryBuilder, AuditEventKind, AuditFilter, AuditStore, AuditTrail, SecurityLevel,
    TenantAuditEntry,
};
use crate::boundary::{
    BoundaryRegistry, InMemoryBoundaryRegistry, resource_type_requires_encryption,
};
use crate::clock::{Clock, SystemClock};
use crate::config::{SecurityConfig, Validatable};
use crate::context::{ContextInput, ContextValidator, IsolationLevel, TenantSecurityContext};
use crate::crypto::{EncryptedPayload, KeyMaterial, TenantCipher};
use crate::error::{Result, SecurityError};
use crate::ownership::{ResourceOwnership, ScopedIdOwnership};
use crate::risk::{self, RiskScore};
use crate::token::TokenSigner;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tenantguard_telemetry::metrics::SecurityMetrics;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Placeholder identity recorded when a request carries none.
const UNKNOWN: &str = "unknown";

/// A failed check, carried to the point where its audit entry is written.
#[derive(Debug)]
struct Denial {
    kind: AuditEventKind,
    error: SecurityError,
    risk: RiskScore,
    isolation_violation: bool,
}

impl Denial {
    fn new(kind: AuditEventKind, error: SecurityError, base: RiskScore) -> Self {
        Self {
            kind,
            risk: risk::denial_risk(base, &error),
            error,
            isolation_violation: false,
        }
    }

    fn violation(error: SecurityError, base: RiskScore) -> Self {
        Self {
            isolation_violation: true,
            ..Self::new(AuditEventKind::IsolationBoundaryViolated, error, base)
        }
    }
}

struct DataAccessGrant {
    risk: RiskScore,
    classification: String,
    encryption_required: bool,
    encrypted_data: Option<EncryptedPayload>,
}

struct CrossTenantEvaluation {
    risk: RiskScore,
    requires_approval: bool,
    suspicious: bool,
    target: String,
    metadata: Vec<(&'static str, serde_json::Value)>,
    denial: Option<Denial>,
}

/// Builder for [`TenantSecurityService`].
pub struct TenantSecurityServiceBuilder {
    config: SecurityConfig,
    clock: Arc<dyn Clock>,
    audit_store: Option<Arc<dyn AuditStore>>,
    boundaries: Arc<dyn BoundaryRegistry>,
    activity: Option<Arc<dyn ActivityStore>>,
    ownership: Arc<dyn ResourceOwnership>,
}

impl TenantSecurityServiceBuilder {
    /// Uses the given time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Stores audit entries in `store` instead of the in-memory ring buffer.
    #[must_use]
    pub fn with_audit_store(mut self, store: Arc<dyn AuditStore>) -> Self {
        self.audit_store = Some(store);
        self
    }

    /// Uses the given boundary registry.
    #[must_use]
    pub fn with_boundary_registry(mut self, registry: Arc<dyn BoundaryRegistry>) -> Self {
        self.boundaries = registry;
        self
    }

    /// Uses the given activity store.
    #[must_use]
    pub fn with_activity_store(mut self, store: Arc<dyn ActivityStore>) -> Self {
        self.activity = Some(store);
        self
    }

    /// Uses the given ownership lookup.
    #[must_use]
    pub fn with_ownership(mut self, ownership: Arc<dyn ResourceOwnership>) -> Self {
        self.ownership = ownership;
        self
    }

    /// Validates the configuration and builds the service.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if validation fails or the token secret
    /// or master key are unusable.
    pub fn build(self) -> Result<TenantSecurityService> {
        self.config
            .validate()
            .map_err(|e| SecurityError::configuration(e.to_string()))?;

        let now = self.clock.now();
        let cipher = TenantCipher::from_settings(&self.config.encryption, now)?;
        let tokens = TokenSigner::new(&self.config.tokens.secret, self.config.tokens.ttl())?;
        let audit = match self.audit_store {
            Some(store) => AuditTrail::with_store(store, &self.config.audit),
            None => AuditTrail::new(&self.config.audit),
        };
        let activity = self.activity.unwrap_or_else(|| {
            Arc::new(InMemoryActivityStore::new(self.config.activity.clone()))
        });

        SecurityMetrics::register();
        info!(
            audit_capacity = self.config.audit.capacity,
            audit_sealed = audit.is_sealed(),
            key_id = %cipher.active_key_id(),
            "Tenant security service initialized"
        );

        Ok(TenantSecurityService {
            access: AccessController::new(self.config.access.cache_ttl()),
            validator: ContextValidator::default(),
            clock: self.clock,
            boundaries: self.boundaries,
            ownership: self.ownership,
            activity,
            audit,
            cipher,
            tokens,
            violations: DashMap::new(),
            config: self.config,
        })
    }
}

/// Enforces tenant isolation and access control and records every decision.
pub struct TenantSecurityService {
    config: SecurityConfig,
    clock: Arc<dyn Clock>,
    validator: ContextValidator,
    boundaries: Arc<dyn BoundaryRegistry>,
    ownership: Arc<dyn ResourceOwnership>,
    access: AccessController,
    activity: Arc<dyn ActivityStore>,
    audit: AuditTrail,
    cipher: TenantCipher,
    tokens: TokenSigner,
    // One entry per (tenant, user) that ever violated isolation; kept until
    // cleared with `reset_violations` so alerts keep escalating.
    violations: DashMap<(String, String), u32>,
}

impl std::fmt::Debug for TenantSecurityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantSecurityService")
            .field("audit", &self.audit)
            .field("cipher", &self.cipher)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl TenantSecurityService {
    /// Starts building a service with in-memory stores, the system clock and
    /// scoped-id ownership.
    #[must_use]
    pub fn builder(config: SecurityConfig) -> TenantSecurityServiceBuilder {
        TenantSecurityServiceBuilder {
            config,
            clock: Arc::new(SystemClock),
            audit_store: None,
            boundaries: Arc::new(InMemoryBoundaryRegistry::new()),
            activity: None,
            ownership: Arc::new(ScopedIdOwnership),
        }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// The audit trail, for queries and chain verification.
    #[must_use]
    pub const fn audit_trail(&self) -> &AuditTrail {
        &self.audit
    }

    /// The boundary registry.
    #[must_use]
    pub fn boundaries(&self) -> &Arc<dyn BoundaryRegistry> {
        &self.boundaries
    }

    /// The activity store.
    #[must_use]
    pub fn activity(&self) -> &Arc<dyn ActivityStore> {
        &self.activity
    }

    /// The access controller and its decision cache.
    #[must_use]
    pub const fn access_controller(&self) -> &AccessController {
        &self.access
    }

    /// Number of isolation violations recorded for a user of a tenant.
    #[must_use]
    pub fn violation_count(&self, tenant_id: &str, user_id: &str) -> u32 {
        self.violations
            .get(&(tenant_id.to_string(), user_id.to_string()))
            .map_or(0, |count| *count)
    }

    /// Clears a user's violation count, returning the count it had.
    pub fn reset_violations(&self, tenant_id: &str, user_id: &str) -> u32 {
        let count = self
            .violations
            .remove(&(tenant_id.to_string(), user_id.to_string()))
            .map_or(0, |(_, count)| count);
        if count > 0 {
            info!(%tenant_id, %user_id, violations = count, "Violation count cleared");
        }
        count
    }

    /// Enforces isolation and access control for a data access.
    ///
    /// Checks run in a fixed order and stop at the first failure: context
    /// validation, boundary resolution, resource ownership and isolation
    /// level, permissions, then encryption of the payload when the resource
    /// requires it. Permission decisions are cached for the configured TTL,
    /// so a revoked permission may keep granting access until its cache
    /// entry expires.
    pub async fn enforce_data_access(
        &self,
        request: DataAccessRequest,
        input: ContextInput,
    ) -> DataAccessOutcome {
        let now = self.clock.now();
        let operation = request.operation.as_str();
        let resource_type = self.text(&request.resource_type);
        let resource_id = self.text(&request.resource_id);

        let mut context = match self.validator.validate(&input) {
            Ok(context) => context,
            Err(err) => {
                let risk = risk::denial_risk(RiskScore::MIN, &err);
                let entry = self
                    .anonymous_entry(AuditEventKind::TenantAccessDenied, &input, operation)
                    .resource(resource_type, resource_id)
                    .error(err.to_string())
                    .risk(risk)
                    .build(now);
                let audit_entry_id = self.audit(entry).await;
                SecurityMetrics::access_decision(false, AuditEventKind::TenantAccessDenied.as_str());
                return DataAccessOutcome {
                    allowed: false,
                    security: None,
                    error: Some(err.to_string()),
                    encrypted_data: None,
                    risk_score: risk,
                    isolation_violation: false,
                    audit_entry_id,
                };
            }
        };

        let evaluation = self.evaluate_data_access(&mut context, &request, now).await;
        let mut entry = TenantAuditEntry::builder(
            AuditEventKind::TenantAccessGranted,
            context.tenant_id.as_str(),
            context.user_id.as_str(),
            operation,
        )
        .context(&context)
        .resource(resource_type.as_str(), resource_id.as_str());
        if !request.data_fields.is_empty() {
            entry = entry.data_fields(request.data_fields.iter().map(|f| self.text(f)).collect());
        }

        match evaluation {
            Ok(grant) => {
                let entry = entry
                    .success(true)
                    .risk(grant.risk)
                    .metadata("classification", grant.classification)
                    .metadata("encryption_required", grant.encryption_required)
                    .metadata("encrypted", grant.encrypted_data.is_some())
                    .build(now);
                context.audit_entry_id = self.audit(entry).await;
                SecurityMetrics::access_decision(true, AuditEventKind::TenantAccessGranted.as_str());
                debug!(
                    tenant_id = %context.tenant_id,
                    user_id = %context.user_id,
                    resource_type = %resource_type,
                    operation,
                    "Data access granted"
                );
                DataAccessOutcome {
                    allowed: true,
                    error: None,
                    encrypted_data: grant.encrypted_data,
                    risk_score: grant.risk,
                    isolation_violation: false,
                    audit_entry_id: context.audit_entry_id,
                    security: Some(context),
                }
            }
            Err(denial) => {
                let entry = entry
                    .kind(denial.kind)
                    .isolation_violation(denial.isolation_violation)
                    .error(denial.error.to_string())
                    .risk(denial.risk)
                    .build(now);
                context.audit_entry_id = self.audit(entry).await;
                SecurityMetrics::access_decision(false, denial.kind.as_str());
                if denial.isolation_violation {
                    self.record_violation(&context, now).await;
                }
                DataAccessOutcome {
                    allowed: false,
                    error: Some(denial.error.to_string()),
                    encrypted_data: None,
                    risk_score: denial.risk,
                    isolation_violation: denial.isolation_violation,
                    audit_entry_id: context.audit_entry_id,
                    security: Some(context),
                }
            }
        }
    }

    async fn evaluate_data_access(
        &self,
        context: &mut TenantSecurityContext,
        request: &DataAccessRequest,
        now: DateTime<Utc>,
    ) -> std::result::Result<DataAccessGrant, Denial> {
        let boundary = self
            .boundaries
            .get_or_create_default(&context.tenant_id, now)
            .await
            .map_err(|e| Denial::new(AuditEventKind::TenantAccessDenied, e, RiskScore::MAX))?;
        context.attach_boundary(Arc::clone(&boundary));

        let policy = boundary.matrix.resource_policy(&request.resource_type);
        let classification = request.classification.unwrap_or(policy.classification);
        let base = risk::data_access_risk(classification, request.operation);

        let owned = self
            .ownership
            .resource_belongs_to_tenant(
                &request.resource_type,
                &request.resource_id,
                &context.tenant_id,
            )
            .await
            .map_err(|e| Denial::new(AuditEventKind::TenantAccessDenied, e, base))?;
        if !owned {
            return Err(Denial::violation(
                SecurityError::isolation_violation(format!(
                    "Resource {} does not belong to tenant {}",
                    self.text(&request.resource_id),
                    context.tenant_id
                )),
                base,
            ));
        }
        if policy.isolation_level == IsolationLevel::Strict
            && context.isolation_level != IsolationLevel::Strict
        {
            return Err(Denial::violation(
                SecurityError::isolation_violation(format!(
                    "Resource type {} requires strict isolation, context is {}",
                    self.text(&request.resource_type),
                    context.isolation_level
                )),
                base,
            ));
        }

        let decision = self.access.check(
            context,
            &boundary,
            &request.resource_type,
            request.operation,
            now,
        );
        if !decision.allowed {
            let reason = decision
                .reason
                .unwrap_or_else(|| "Insufficient permissions".to_string());
            return Err(Denial::new(
                AuditEventKind::TenantAccessDenied,
                SecurityError::access_denied(context.user_id.as_str(), reason),
                base,
            ));
        }

        let encryption_required = policy.encryption_required
            || classification.requires_encryption()
            || resource_type_requires_encryption(&request.resource_type);
        let encrypted_data = match &request.payload {
            Some(payload) if encryption_required => {
                let result = self.cipher.encrypt_json(&context.tenant_id, payload);
                SecurityMetrics::crypto_operation("encrypt", result.is_ok());
                Some(result.map_err(|e| Denial::new(AuditEventKind::EncryptionFailed, e, base))?)
            }
            _ => None,
        };

        Ok(DataAccessGrant {
            risk: base,
            classification: classification.to_string(),
            encryption_required,
            encrypted_data,
        })
    }

    /// Validates a request to reach another tenant's data.
    ///
    /// The request is recorded in the user's activity history on every call,
    /// including calls that end up denied. Denials are reported in check
    /// order: source tenant, operation policy, boundary restrictions, role,
    /// then suspicious activity. Approval is required when the caller asks
    /// for it, when the operation policy demands it, or when the policy's
    /// risk level is high or critical.
    pub async fn validate_cross_tenant_access(
        &self,
        request: CrossTenantRequest,
        input: ContextInput,
    ) -> CrossTenantOutcome {
        let now = self.clock.now();
        let operation = self.text(&request.operation);

        let mut context = match self.validator.validate(&input) {
            Ok(context) => context,
            Err(err) => {
                let risk = risk::denial_risk(RiskScore::MIN, &err);
                let entry = self
                    .anonymous_entry(
                        AuditEventKind::CrossTenantAccessAttempted,
                        &input,
                        operation.as_str(),
                    )
                    .resource("tenant", self.text(&request.target_tenant))
                    .error(err.to_string())
                    .risk(risk)
                    .build(now);
                let audit_entry_id = self.audit(entry).await;
                SecurityMetrics::cross_tenant_request(false);
                return CrossTenantOutcome {
                    allowed: false,
                    security: None,
                    error: Some(err.to_string()),
                    requires_approval: request.requires_approval,
                    suspicious: false,
                    risk_score: risk,
                    audit_entry_id,
                };
            }
        };

        let evaluation = self.evaluate_cross_tenant(&mut context, &request, now).await;
        let (kind, success) = match &evaluation.denial {
            Some(denial) => (denial.kind, false),
            None => (AuditEventKind::CrossTenantAccessGranted, true),
        };
        let risk_score = evaluation.denial.as_ref().map_or(evaluation.risk, |d| d.risk);
        let error_message = evaluation.denial.as_ref().map(|d| d.error.to_string());

        let mut entry = TenantAuditEntry::builder(
            kind,
            context.tenant_id.as_str(),
            context.user_id.as_str(),
            operation.as_str(),
        )
        .context(&context)
        .resource("tenant", evaluation.target.as_str())
        .success(success)
        .risk(risk_score)
        .metadata("source_tenant", self.text(&request.source_tenant))
        .metadata("target_tenant", evaluation.target.as_str())
        .metadata("requires_approval", evaluation.requires_approval)
        .metadata("suspicious", evaluation.suspicious);
        if let Some(justification) = &request.justification {
            entry = entry.metadata("justification", self.text(justification));
        }
        for (key, value) in evaluation.metadata {
            entry = entry.metadata(key, value);
        }
        if let Some(message) = &error_message {
            entry = entry.error(message.as_str());
        }
        context.audit_entry_id = self.audit(entry.build(now)).await;
        SecurityMetrics::cross_tenant_request(success);

        if success {
            info!(
                tenant_id = %context.tenant_id,
                user_id = %context.user_id,
                target_tenant = %evaluation.target,
                operation = %operation,
                requires_approval = evaluation.requires_approval,
                "Cross-tenant access granted"
            );
        }

        CrossTenantOutcome {
            allowed: success,
            error: error_message,
            requires_approval: evaluation.requires_approval,
            suspicious: evaluation.suspicious,
            risk_score,
            audit_entry_id: context.audit_entry_id,
            security: Some(context),
        }
    }

    async fn evaluate_cross_tenant(
        &self,
        context: &mut TenantSecurityContext,
        request: &CrossTenantRequest,
        now: DateTime<Utc>,
    ) -> CrossTenantEvaluation {
        let operation = request.operation.trim();
        let mut evaluation = CrossTenantEvaluation {
            risk: risk::cross_tenant_risk(operation, 0),
            requires_approval: request.requires_approval,
            suspicious: false,
            target: self.text(&request.target_tenant),
            metadata: Vec::new(),
            denial: None,
        };
        let deny = |error: SecurityError, base: RiskScore| {
            Some(Denial::new(AuditEventKind::CrossTenantAccessAttempted, error, base))
        };

        let target = match self
            .validator
            .sanitizer()
            .tenant_identifier("target_tenant", &request.target_tenant)
        {
            Ok(target) => target,
            Err(err) => {
                evaluation.denial = deny(err, evaluation.risk);
                return evaluation;
            }
        };
        evaluation.target.clone_from(&target);

        let record = CrossTenantRequestRecord {
            at: now,
            source_tenant: self.text(&request.source_tenant),
            target_tenant: target.clone(),
            operation: operation.to_string(),
        };
        let assessment = match self.activity.record_and_assess(&context.user_id, record).await {
            Ok(assessment) => assessment,
            Err(err) => {
                evaluation.denial = deny(err, RiskScore::MAX);
                return evaluation;
            }
        };
        evaluation.risk = risk::cross_tenant_risk(operation, assessment.consecutive_switches);
        evaluation.suspicious = assessment.suspicious;
        evaluation.metadata = vec![
            ("consecutive_switches", assessment.consecutive_switches.into()),
            ("requests_in_window", assessment.requests_in_window.into()),
            ("distinct_targets", assessment.distinct_targets.into()),
        ];
        if assessment.suspicious {
            SecurityMetrics::suspicious_activity();
            warn!(
                user_id = %context.user_id,
                reasons = ?assessment.reasons,
                "Suspicious cross-tenant activity"
            );
        }
        let base = evaluation.risk;

        if request.source_tenant.trim() != context.tenant_id {
            evaluation.denial = deny(
                SecurityError::access_denied(
                    context.user_id.as_str(),
                    format!(
                        "Context tenant {} does not match source tenant {}",
                        context.tenant_id,
                        self.text(&request.source_tenant)
                    ),
                ),
                base,
            );
            return evaluation;
        }

        let boundary = match self
            .boundaries
            .get_or_create_default(&context.tenant_id, now)
            .await
        {
            Ok(boundary) => boundary,
            Err(err) => {
                evaluation.denial = deny(err, RiskScore::MAX);
                return evaluation;
            }
        };
        context.attach_boundary(Arc::clone(&boundary));

        let policy = boundary.matrix.operation_policy(operation);
        evaluation.requires_approval = request.requires_approval
            || policy.requires_approval
            || policy.risk_level.is_elevated();
        evaluation
            .metadata
            .push(("risk_level", policy.risk_level.to_string().into()));

        let refusal = if !policy.cross_tenant_allowed {
            Some(format!("Operation {operation} is not permitted across tenants"))
        } else if boundary.is_restricted(operation) {
            Some(format!(
                "Operation {operation} is restricted for tenant {}",
                context.tenant_id
            ))
        } else if !boundary.allows_target(&target) {
            Some(format!(
                "Tenant {target} is not an allowed target for tenant {}",
                context.tenant_id
            ))
        } else if !context.role.satisfies(policy.minimum_role) {
            Some(format!(
                "Role {} is below the minimum role {} for {operation}",
                context.role, policy.minimum_role
            ))
        } else {
            None
        };
        if let Some(reason) = refusal {
            evaluation.denial = deny(
                SecurityError::access_denied(context.user_id.as_str(), reason),
                base,
            );
            return evaluation;
        }

        if assessment.suspicious {
            evaluation.denial = Some(Denial::new(
                AuditEventKind::SuspiciousActivityDetected,
                SecurityError::suspicious_activity(
                    context.user_id.as_str(),
                    assessment.reasons.join("; "),
                ),
                base,
            ));
        }
        evaluation
    }

    /// Encrypts `data` for `tenant_id` and records the operation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidContext` for malformed identifiers, or an encryption
    /// error if the payload cannot be serialized or sealed.
    pub async fn encrypt_tenant_data<T: Serialize>(
        &self,
        tenant_id: &str,
        user_id: &str,
        data: &T,
    ) -> Result<EncryptedPayload> {
        let (tenant_id, user_id) = self.identities(tenant_id, user_id)?;
        let result = self.cipher.encrypt_json(&tenant_id, data);
        SecurityMetrics::crypto_operation("encrypt", result.is_ok());

        let key_id = result.as_ref().map_or_else(|_| self.cipher.active_key_id(), |p| p.key_id.clone());
        self.audit_crypto(
            AuditEventKind::DataEncrypted,
            "encrypt",
            &tenant_id,
            &user_id,
            &key_id,
            result.as_ref().err(),
        )
        .await;
        result
    }

    /// Decrypts a payload sealed for `tenant_id` and records the operation.
    ///
    /// Fails closed: a payload sealed for another tenant, a tampered
    /// ciphertext or tag, or an unknown key never yields plaintext.
    ///
    /// # Errors
    ///
    /// Returns `InvalidContext` for malformed identifiers, or a decryption
    /// error if authentication fails or the plaintext is not valid JSON.
    pub async fn decrypt_tenant_data<T: DeserializeOwned>(
        &self,
        tenant_id: &str,
        user_id: &str,
        payload: &EncryptedPayload,
    ) -> Result<T> {
        let (tenant_id, user_id) = self.identities(tenant_id, user_id)?;
        let result = self.cipher.decrypt_json(&tenant_id, payload);
        SecurityMetrics::crypto_operation("decrypt", result.is_ok());

        self.audit_crypto(
            AuditEventKind::DataDecrypted,
            "decrypt",
            &tenant_id,
            &user_id,
            &self.text(&payload.key_id),
            result.as_ref().err(),
        )
        .await;
        result
    }

    /// Installs a new active encryption key; older keys stay available for
    /// decryption.
    ///
    /// # Errors
    ///
    /// Returns an error if the key id is already in use.
    pub fn rotate_encryption_key(&self, key_id: &str, material: KeyMaterial) -> Result<()> {
        self.cipher.rotate(key_id, material, self.clock.now())?;
        info!(key_id, "Encryption key rotated");
        Ok(())
    }

    /// Returns true if the active key is older than the tenant's rotation
    /// interval.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant's boundary cannot be resolved.
    pub async fn key_rotation_due(&self, tenant_id: &str) -> Result<bool> {
        let now = self.clock.now();
        let boundary = self.boundaries.get_or_create_default(tenant_id, now).await?;
        Ok(self
            .cipher
            .needs_rotation(now, boundary.encryption.key_rotation_days))
    }

    /// Issues a signed token for a tenant user.
    ///
    /// # Errors
    ///
    /// Returns `InvalidContext` for malformed identifiers.
    pub async fn generate_security_token(
        &self,
        tenant_id: &str,
        user_id: &str,
        permissions: Vec<String>,
    ) -> Result<String> {
        let now = self.clock.now();
        let (tenant_id, user_id) = self.identities(tenant_id, user_id)?;
        let sanitizer = self.validator.sanitizer();
        let permissions = permissions
            .iter()
            .map(|p| sanitizer.clean(p))
            .filter(|p| !p.is_empty())
            .collect();

        let claims = self
            .tokens
            .claims(tenant_id.as_str(), user_id.as_str(), permissions, now);
        let token = self.tokens.issue(&claims)?;

        let entry = TenantAuditEntry::builder(
            AuditEventKind::SecurityTokenIssued,
            tenant_id,
            user_id,
            "issue_token",
        )
        .success(true)
        .metadata("jti", claims.jti.as_str())
        .metadata("expires_at", claims.exp)
        .build(now);
        self.audit(entry).await;
        Ok(token)
    }

    /// Verifies a token. Rejections are audited.
    pub async fn verify_security_token(&self, token: &str) -> TokenVerification {
        let now = self.clock.now();
        match self.tokens.verify(token.trim(), now) {
            Ok(claims) => {
                SecurityMetrics::token_verification("valid");
                debug!(tenant_id = %claims.tenant_id, user_id = %claims.user_id, "Security token verified");
                TokenVerification {
                    valid: true,
                    claims: Some(claims),
                    error: None,
                }
            }
            Err(err) => {
                SecurityMetrics::token_verification(err.kind());
                let entry = TenantAuditEntry::builder(
                    AuditEventKind::SecurityTokenRejected,
                    UNKNOWN,
                    UNKNOWN,
                    "verify_token",
                )
                .error(err.to_string())
                .risk(risk::denial_risk(RiskScore::MIN, &err))
                .metadata("reason", err.kind())
                .build(now);
                self.audit(entry).await;
                TokenVerification {
                    valid: false,
                    claims: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// Summarises a tenant's retained audit entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the audit store cannot be queried.
    #[allow(clippy::cast_precision_loss)]
    pub async fn security_summary(&self, tenant_id: &str) -> Result<TenantSecuritySummary> {
        let entries = self
            .audit
            .query(&AuditFilter::new().with_tenant(tenant_id))
            .await?;

        let mut summary = TenantSecuritySummary {
            tenant_id: tenant_id.to_string(),
            total_entries: entries.len(),
            ..TenantSecuritySummary::default()
        };
        let mut total_risk = 0u64;
        for sealed in &entries {
            let entry = sealed.entry();
            total_risk += u64::from(entry.risk_score().value());
            match entry.kind() {
                AuditEventKind::TenantAccessGranted | AuditEventKind::CrossTenantAccessGranted => {
                    summary.granted += 1;
                }
                AuditEventKind::TenantAccessDenied | AuditEventKind::CrossTenantAccessAttempted => {
                    summary.denied += 1;
                }
                AuditEventKind::IsolationBoundaryViolated => {
                    summary.denied += 1;
                    summary.isolation_violations += 1;
                }
                AuditEventKind::SuspiciousActivityDetected => {
                    summary.denied += 1;
                    summary.suspicious_events += 1;
                }
                AuditEventKind::CriticalSecurityAlert => summary.critical_alerts += 1,
                _ => {}
            }
        }
        if !entries.is_empty() {
            summary.average_risk = total_risk as f64 / entries.len() as f64;
        }
        Ok(summary)
    }

    async fn record_violation(&self, context: &TenantSecurityContext, now: DateTime<Utc>) {
        let count = {
            let mut count = self
                .violations
                .entry((context.tenant_id.clone(), context.user_id.clone()))
                .or_insert(0);
            *count += 1;
            *count
        };
        SecurityMetrics::isolation_violation();
        warn!(
            tenant_id = %context.tenant_id,
            user_id = %context.user_id,
            violations = count,
            "Tenant isolation violation"
        );

        if count < self.config.access.violation_alert_threshold {
            return;
        }
        SecurityMetrics::critical_alert();
        error!(
            tenant_id = %context.tenant_id,
            user_id = %context.user_id,
            violations = count,
            "Repeated isolation violations"
        );
        let entry = TenantAuditEntry::builder(
            AuditEventKind::CriticalSecurityAlert,
            context.tenant_id.as_str(),
            context.user_id.as_str(),
            "isolation_violation_threshold",
        )
        .context(context)
        .isolation_violation(true)
        .error(format!(
            "{count} isolation violations recorded for user {}",
            context.user_id
        ))
        .risk(RiskScore::MAX)
        .security_level(SecurityLevel::Critical)
        .metadata("violation_count", count)
        .build(now);
        self.audit(entry).await;
    }

    async fn audit_crypto(
        &self,
        kind: AuditEventKind,
        operation: &str,
        tenant_id: &str,
        user_id: &str,
        key_id: &str,
        failure: Option<&SecurityError>,
    ) {
        let builder = TenantAuditEntry::builder(kind, tenant_id, user_id, operation)
            .metadata("key_id", key_id);
        let entry = match failure {
            None => builder.success(true),
            Some(err) => builder
                .kind(AuditEventKind::EncryptionFailed)
                .error(err.to_string())
                .risk(risk::denial_risk(RiskScore::MIN, err)),
        };
        self.audit(entry.build(self.clock.now())).await;
    }

    async fn audit(&self, entry: TenantAuditEntry) -> Option<Uuid> {
        match self.audit.record(entry).await {
            Ok(id) => Some(id),
            Err(err) => {
                error!(error = %err, "Failed to append audit entry");
                None
            }
        }
    }

    fn anonymous_entry(
        &self,
        kind: AuditEventKind,
        input: &ContextInput,
        operation: &str,
    ) -> AuditEntryBuilder {
        let identity = |value: Option<&String>| {
            value
                .map(|v| self.text(v))
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string())
        };
        TenantAuditEntry::builder(
            kind,
            identity(input.tenant_id.as_ref()),
            identity(input.user_id.as_ref()),
            operation,
        )
    }

    fn identities(&self, tenant_id: &str, user_id: &str) -> Result<(String, String)> {
        let sanitizer = self.validator.sanitizer();
        Ok((
            sanitizer.tenant_identifier("tenant_id", tenant_id)?,
            sanitizer.identifier("user_id", user_id)?,
        ))
    }

    fn text(&self, value: &str) -> String {
        self.validator.sanitizer().sanitize_text(value)
    }
}
