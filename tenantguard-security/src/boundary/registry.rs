//! Boundary registry storage interface.

use super::tenant::TenantSecurityBoundary;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Storage for tenant security boundaries.
///
/// Implementations can keep boundaries in memory, a database, or a
/// distributed cache.
#[async_trait]
pub trait BoundaryRegistry: Send + Sync {
    /// Returns the boundary of a tenant, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    async fn get(&self, tenant_id: &str) -> Result<Option<Arc<TenantSecurityBoundary>>>;

    /// Returns the boundary of a tenant, creating the strict default if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or insert fails.
    async fn get_or_create_default(
        &self,
        tenant_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Arc<TenantSecurityBoundary>>;

    /// Inserts or replaces a boundary.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn upsert(&self, boundary: TenantSecurityBoundary) -> Result<()>;

    /// Removes a boundary, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    async fn remove(&self, tenant_id: &str) -> Result<bool>;

    /// Lists tenants with a boundary.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    async fn tenants(&self) -> Result<Vec<String>>;
}

/// In-memory boundary registry.
#[derive(Debug, Default)]
pub struct InMemoryBoundaryRegistry {
    boundaries: DashMap<String, Arc<TenantSecurityBoundary>>,
}

impl InMemoryBoundaryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BoundaryRegistry for InMemoryBoundaryRegistry {
    async fn get(&self, tenant_id: &str) -> Result<Option<Arc<TenantSecurityBoundary>>> {
        Ok(self.boundaries.get(tenant_id).map(|b| Arc::clone(b.value())))
    }

    async fn get_or_create_default(
        &self,
        tenant_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Arc<TenantSecurityBoundary>> {
        let entry = self
            .boundaries
            .entry(tenant_id.to_string())
            .or_insert_with(|| {
                debug!(tenant_id, "Creating default security boundary");
                Arc::new(TenantSecurityBoundary::strict_default(tenant_id, now))
            });
        Ok(Arc::clone(entry.value()))
    }

    async fn upsert(&self, boundary: TenantSecurityBoundary) -> Result<()> {
        debug!(tenant_id = %boundary.tenant_id, "Updating security boundary");
        self.boundaries
            .insert(boundary.tenant_id.clone(), Arc::new(boundary));
        Ok(())
    }

    async fn remove(&self, tenant_id: &str) -> Result<bool> {
        Ok(self.boundaries.remove(tenant_id).is_some())
    }

    async fn tenants(&self) -> Result<Vec<String>> {
        let mut tenants: Vec<String> = self.boundaries.iter().map(|e| e.key().clone()).collect();
        tenants.sort();
        Ok(tenants)
    }
}
