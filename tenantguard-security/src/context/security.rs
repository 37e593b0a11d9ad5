//! Per-request security context.

use super::sanitize::InputSanitizer;
use super::types::{IsolationLevel, Role};
use crate::boundary::TenantSecurityBoundary;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Partial context as supplied by the session layer. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextInput {
    /// Tenant the request is made for.
    pub tenant_id: Option<String>,
    /// Human-readable tenant slug.
    pub tenant_slug: Option<String>,
    /// Owning organization.
    pub organization_id: Option<String>,
    /// Authenticated user.
    pub user_id: Option<String>,
    /// Role name; unknown names degrade to `user`.
    pub role: Option<String>,
    /// Session identifier.
    pub session_id: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// Granted permission strings (`resource:operation`).
    pub permissions: Vec<String>,
    /// Requested isolation level; the tenant default applies when absent.
    pub isolation_level: Option<IsolationLevel>,
}

impl ContextInput {
    /// Creates an input for the given tenant and user.
    #[must_use]
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    /// Sets the role name.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Adds granted permissions.
    #[must_use]
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    /// Sets the isolation level.
    #[must_use]
    pub fn with_isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = Some(level);
        self
    }

    /// Sets the session id.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets client network details.
    #[must_use]
    pub fn with_client(mut self, ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Validated security context for one request.
///
/// Built by [`ContextValidator`], bound to its tenant's boundary by the
/// service, and discarded when the request completes.
#[derive(Debug, Clone, Serialize)]
pub struct TenantSecurityContext {
    /// Tenant id.
    pub tenant_id: String,
    /// Tenant slug.
    pub tenant_slug: Option<String>,
    /// Organization id.
    pub organization_id: Option<String>,
    /// User id.
    pub user_id: String,
    /// Effective role.
    pub role: Role,
    /// Session id, generated when the caller supplied none.
    pub session_id: String,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Sanitised user agent.
    pub user_agent: Option<String>,
    /// Granted permissions.
    pub permissions: BTreeSet<String>,
    /// Effective isolation level.
    pub isolation_level: IsolationLevel,
    /// Id of the audit entry written for this request's decision.
    pub audit_entry_id: Option<Uuid>,
    #[serde(skip)]
    boundary: Option<Arc<TenantSecurityBoundary>>,
    #[serde(skip)]
    isolation_explicit: bool,
}

impl TenantSecurityContext {
    /// Binds the tenant's boundary; an unset isolation level adopts the boundary default.
    pub fn attach_boundary(&mut self, boundary: Arc<TenantSecurityBoundary>) {
        if !self.isolation_explicit {
            self.isolation_level = boundary.default_isolation;
        }
        self.boundary = Some(boundary);
    }

    /// The boundary bound to this context, if resolved.
    #[must_use]
    pub fn boundary(&self) -> Option<&TenantSecurityBoundary> {
        self.boundary.as_deref()
    }
}

/// Validates and normalises [`ContextInput`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextValidator {
    sanitizer: InputSanitizer,
}

impl ContextValidator {
    /// Creates a validator with the given sanitizer.
    #[must_use]
    pub const fn new(sanitizer: InputSanitizer) -> Self {
        Self { sanitizer }
    }

    /// Returns the sanitizer used for free text.
    #[must_use]
    pub const fn sanitizer(&self) -> &InputSanitizer {
        &self.sanitizer
    }

    /// Validates the input.
    ///
    /// # Errors
    ///
    /// Returns `InvalidContext` if the tenant or user id is missing or
    /// malformed, or if a supplied session id is malformed.
    pub fn validate(&self, input: &ContextInput) -> Result<TenantSecurityContext> {
        let tenant_id = self
            .sanitizer
            .tenant_identifier("tenant_id", input.tenant_id.as_deref().unwrap_or_default())?;
        let user_id = self
            .sanitizer
            .identifier("user_id", input.user_id.as_deref().unwrap_or_default())?;

        let session_id = match input.session_id.as_deref() {
            Some(session) if !session.trim().is_empty() => {
                self.sanitizer.identifier("session_id", session)?
            }
            _ => Uuid::new_v4().to_string(),
        };

        let role = match input.role.as_deref() {
            Some(name) => name.parse().unwrap_or_else(|_| {
                debug!(role = %self.sanitizer.clean(name), "Unknown role, using least privilege");
                Role::User
            }),
            None => Role::User,
        };

        let optional = |value: Option<&String>| {
            value
                .map(|v| self.sanitizer.sanitize_text(v))
                .filter(|v| !v.is_empty())
        };

        let permissions = input
            .permissions
            .iter()
            .map(|p| self.sanitizer.clean(p))
            .filter(|p| !p.is_empty())
            .collect();

        Ok(TenantSecurityContext {
            tenant_id,
            tenant_slug: optional(input.tenant_slug.as_ref()),
            organization_id: optional(input.organization_id.as_ref()),
            user_id,
            role,
            session_id,
            ip_address: optional(input.ip_address.as_ref()),
            user_agent: optional(input.user_agent.as_ref()),
            permissions,
            isolation_level: input.isolation_level.unwrap_or_default(),
            audit_entry_id: None,
            boundary: None,
            isolation_explicit: input.isolation_level.is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_identifiers_rejected() {
        let validator = ContextValidator::default();

        let err = validator.validate(&ContextInput::default()).unwrap_err();
        assert!(err.to_string().contains("tenant_id"));

        let input = ContextInput {
            tenant_id: Some("t1".to_string()),
            ..ContextInput::default()
        };
        let err = validator.validate(&input).unwrap_err();
        assert!(err.to_string().contains("user_id"));

        let err = validator.validate(&ContextInput::new("t1", "  ")).unwrap_err();
        assert!(err.is_tenant_error());
    }

    #[test]
    fn test_normalisation() {
        let input = ContextInput::new(" t1 ", "u1")
            .with_role("superuser")
            .with_permissions(["cart:read", "  ", "order:*"])
            .with_client("10.0.0.1", "Mozilla <b>");

        let ctx = ContextValidator::default().validate(&input).unwrap();
        assert_eq!(ctx.tenant_id, "t1");
        assert_eq!(ctx.role, Role::User);
        assert_eq!(ctx.permissions.len(), 2);
        assert_eq!(ctx.user_agent.as_deref(), Some("Mozilla &lt;b&gt;"));
        assert!(Uuid::parse_str(&ctx.session_id).is_ok());
        assert!(ctx.audit_entry_id.is_none());
    }

    #[test]
    fn test_explicit_session_kept() {
        let input = ContextInput::new("t1", "u1").with_session("sess-42");
        let ctx = ContextValidator::default().validate(&input).unwrap();
        assert_eq!(ctx.session_id, "sess-42");
    }

    #[test]
    fn test_boundary_default_isolation() {
        let mut boundary = TenantSecurityBoundary::strict_default("t1", chrono::Utc::now());
        boundary.default_isolation = IsolationLevel::Controlled;
        let boundary = Arc::new(boundary);

        let validator = ContextValidator::default();

        let mut implicit = validator.validate(&ContextInput::new("t1", "u1")).unwrap();
        implicit.attach_boundary(Arc::clone(&boundary));
        assert_eq!(implicit.isolation_level, IsolationLevel::Controlled);
        assert!(implicit.boundary().is_some());

        let mut explicit = validator
            .validate(&ContextInput::new("t1", "u1").with_isolation(IsolationLevel::Strict))
            .unwrap();
        explicit.attach_boundary(boundary);
        assert_eq!(explicit.isolation_level, IsolationLevel::Strict);
    }
}
