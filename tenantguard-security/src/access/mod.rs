//! Access-control evaluation.
//!
//! The requester's effective permissions (context grants united with role
//! grants from the tenant matrix) must grant the operation on the resource
//! type and satisfy every permission the resource policy requires. Decisions
//! are cached per (tenant, user, resource type, operation).

mod cache;
mod permission;

pub use cache::{AccessCacheKey, AccessDecision, AccessDecisionCache};
pub use permission::{PermissionSet, WILDCARD};

use crate::boundary::TenantSecurityBoundary;
use crate::context::{DataOperation, TenantSecurityContext};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Evaluates permission checks through the decision cache.
#[derive(Debug)]
pub struct AccessController {
    cache: AccessDecisionCache,
}

impl AccessController {
    /// Creates a controller caching decisions for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: AccessDecisionCache::new(ttl),
        }
    }

    /// The decision cache.
    #[must_use]
    pub const fn cache(&self) -> &AccessDecisionCache {
        &self.cache
    }

    /// Checks whether `context` may perform `operation` on `resource_type`.
    ///
    /// A cached decision younger than the TTL is returned without re-evaluation.
    pub fn check(
        &self,
        context: &TenantSecurityContext,
        boundary: &TenantSecurityBoundary,
        resource_type: &str,
        operation: DataOperation,
        now: DateTime<Utc>,
    ) -> AccessDecision {
        let key = AccessCacheKey::new(
            context.tenant_id.as_str(),
            context.user_id.as_str(),
            resource_type,
            operation,
        );
        if let Some(decision) = self.cache.get(&key, now) {
            debug!(
                user_id = %context.user_id,
                resource_type,
                operation = %operation,
                allowed = decision.allowed,
                "Access decision served from cache"
            );
            return decision;
        }

        let decision = Self::evaluate(context, boundary, resource_type, operation);
        self.cache.insert(key, decision.clone(), now);
        decision
    }

    /// Evaluates the permission rules without consulting the cache.
    #[must_use]
    pub fn evaluate(
        context: &TenantSecurityContext,
        boundary: &TenantSecurityBoundary,
        resource_type: &str,
        operation: DataOperation,
    ) -> AccessDecision {
        let pair = format!("{resource_type}:{operation}");
        if boundary.is_restricted(&pair) {
            return AccessDecision::deny(format!(
                "Operation {pair} is restricted for tenant {}",
                boundary.tenant_id
            ));
        }

        let permissions = PermissionSet::effective(context, &boundary.matrix);
        if !permissions.grants(resource_type, operation.as_str()) {
            return AccessDecision::deny(format!("Insufficient permissions for {pair}"));
        }

        let policy = boundary.matrix.resource_policy(resource_type);
        let missing = permissions.missing(&policy.required_permissions);
        if !missing.is_empty() {
            return AccessDecision::deny(format!(
                "Insufficient permissions for {pair}: missing {}",
                missing.join(", ")
            ));
        }

        AccessDecision::allow()
    }
}
