//! Resource ownership lookup.
//!
//! The isolation check asks an authoritative source whether a resource
//! belongs to the requesting tenant. Unknown or unparseable resources are
//! never owned.

use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

/// Separator between the tenant and local part of a scoped resource id.
pub const SCOPE_SEPARATOR: char = ':';

/// Answers whether a resource belongs to a tenant.
#[async_trait]
pub trait ResourceOwnership: Send + Sync {
    /// Returns true if `resource_id` of `resource_type` is owned by `tenant_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing lookup fails. Callers treat an error
    /// as a denial.
    async fn resource_belongs_to_tenant(
        &self,
        resource_type: &str,
        resource_id: &str,
        tenant_id: &str,
    ) -> Result<bool>;
}

/// Ownership derived from tenant-scoped ids of the form `<tenant>:<local id>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopedIdOwnership;

impl ScopedIdOwnership {
    /// Builds a scoped id.
    #[must_use]
    pub fn scoped_id(tenant_id: &str, local_id: &str) -> String {
        format!("{tenant_id}{SCOPE_SEPARATOR}{local_id}")
    }

    /// Tenant part of a scoped id: everything before the first separator.
    /// Tenant ids never contain the separator, so the local part may.
    #[must_use]
    pub fn owner_of(resource_id: &str) -> Option<&str> {
        let (tenant, local) = resource_id.split_once(SCOPE_SEPARATOR)?;
        (!tenant.is_empty() && !local.is_empty()).then_some(tenant)
    }
}

#[async_trait]
impl ResourceOwnership for ScopedIdOwnership {
    async fn resource_belongs_to_tenant(
        &self,
        _resource_type: &str,
        resource_id: &str,
        tenant_id: &str,
    ) -> Result<bool> {
        Ok(Self::owner_of(resource_id).is_some_and(|owner| owner == tenant_id))
    }
}

/// Explicit registry of (resource type, resource id) to owning tenant.
#[derive(Debug, Default)]
pub struct InMemoryOwnershipRegistry {
    owners: DashMap<(String, String), String>,
}

impl InMemoryOwnershipRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the owner of a resource, replacing any previous owner.
    pub fn register(
        &self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        tenant_id: impl Into<String>,
    ) {
        let key = (resource_type.into(), resource_id.into());
        let tenant_id = tenant_id.into();
        debug!(resource_type = %key.0, resource_id = %key.1, %tenant_id, "Registered resource owner");
        self.owners.insert(key, tenant_id);
    }

    /// Forgets a resource.
    pub fn unregister(&self, resource_type: &str, resource_id: &str) -> bool {
        self.owners
            .remove(&(resource_type.to_string(), resource_id.to_string()))
            .is_some()
    }
}

#[async_trait]
impl ResourceOwnership for InMemoryOwnershipRegistry {
    async fn resource_belongs_to_tenant(
        &self,
        resource_type: &str,
        resource_id: &str,
        tenant_id: &str,
    ) -> Result<bool> {
        let key = (resource_type.to_string(), resource_id.to_string());
        Ok(self
            .owners
            .get(&key)
            .is_some_and(|owner| owner.value() == tenant_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scoped_ids() {
        let ownership = ScopedIdOwnership;
        let id = ScopedIdOwnership::scoped_id("t1", "cart-9");
        assert!(ownership.resource_belongs_to_tenant("cart", &id, "t1").await.unwrap());
        assert!(!ownership.resource_belongs_to_tenant("cart", &id, "t2").await.unwrap());
    }

    #[tokio::test]
    async fn test_unscoped_ids_fail_closed() {
        let ownership = ScopedIdOwnership;
        for id in ["cart-9", ":cart-9", "t1:", ""] {
            assert!(
                !ownership.resource_belongs_to_tenant("cart", id, "t1").await.unwrap(),
                "{id}"
            );
        }
    }

    #[test]
    fn test_owner_of() {
        assert_eq!(ScopedIdOwnership::owner_of("t1:cart-9"), Some("t1"));
        assert_eq!(ScopedIdOwnership::owner_of("cart-9"), None);
    }

    #[tokio::test]
    async fn test_owner_is_first_segment() {
        let ownership = ScopedIdOwnership;
        let id = ScopedIdOwnership::scoped_id("acme", "eu:cart-9");
        assert_eq!(ScopedIdOwnership::owner_of(&id), Some("acme"));
        assert!(ownership.resource_belongs_to_tenant("cart", &id, "acme").await.unwrap());
        assert!(!ownership.resource_belongs_to_tenant("cart", &id, "acme:eu").await.unwrap());
    }

    #[tokio::test]
    async fn test_prefix_is_not_ownership() {
        let ownership = ScopedIdOwnership;
        assert!(!ownership.resource_belongs_to_tenant("cart", "t10:x", "t1").await.unwrap());
    }

    #[tokio::test]
    async fn test_registry() {
        let registry = InMemoryOwnershipRegistry::new();
        registry.register("order", "o-1", "t1");

        assert!(registry.resource_belongs_to_tenant("order", "o-1", "t1").await.unwrap());
        assert!(!registry.resource_belongs_to_tenant("order", "o-1", "t2").await.unwrap());
        assert!(!registry.resource_belongs_to_tenant("cart", "o-1", "t1").await.unwrap());

        assert!(registry.unregister("order", "o-1"));
        assert!(!registry.resource_belongs_to_tenant("order", "o-1", "t1").await.unwrap());
    }
}
