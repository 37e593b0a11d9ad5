//! Tenant security boundaries and the registry that holds them.
//!
//! A boundary is created lazily with the strict default on first access to a
//! tenant and only replaced through [`BoundaryRegistry::upsert`].

mod matrix;
mod registry;
mod tenant;

pub use matrix::{
    AccessControlMatrix, ENCRYPTED_RESOURCE_TYPES, OperationPolicy, ResourcePolicy, RiskLevel,
    resource_type_requires_encryption,
};
pub use registry::{BoundaryRegistry, InMemoryBoundaryRegistry};
pub use tenant::{EncryptionRequirements, TenantSecurityBoundary};
