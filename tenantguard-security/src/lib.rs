//! # Tenantguard Security
//!
//! Tenant isolation and access-control core for multi-tenant platforms.
//!
//! This crate provides:
//! - Validation of per-request security contexts
//! - Per-tenant security boundaries with an access-control matrix
//! - Isolation enforcement backed by a pluggable ownership lookup
//! - Permission evaluation with a short-lived decision cache
//! - Deterministic risk scoring and suspicious cross-tenant activity tracking
//! - A bounded, optionally HMAC-sealed audit trail
//! - AES-256-GCM encryption bound to the tenant id
//! - HMAC-signed tenant security tokens
//!
//! # Example
//!
//! ```no_run
//! use tenantguard_security::prelude::*;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new()
//!     .with_env_prefix(ENV_PREFIX)
//!     .load::<SecurityConfig, _>("tenantguard.yaml")?;
//! let service = TenantSecurityService::builder(config).build()?;
//!
//! let context = ContextInput::new("acme", "alice")
//!     .with_role("admin")
//!     .with_permissions(["order:read"]);
//! let request = DataAccessRequest::new("acme:order-42", "order", DataOperation::Read);
//!
//! let outcome = service.enforce_data_access(request, context).await;
//! if !outcome.allowed {
//!     eprintln!("denied: {:?}", outcome.error);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

/// Error types for the security core
pub mod error;

/// Injectable time source
pub mod clock;

/// Configuration loading and validation
pub mod config;

/// Request security context and input sanitisation
pub mod context;

/// Per-tenant security boundaries
pub mod boundary;

/// Access-control evaluation
pub mod access;

/// Resource ownership lookup
pub mod ownership;

/// Risk scoring
pub mod risk;

/// Suspicious cross-tenant activity tracking
pub mod activity;

/// Security audit trail
pub mod audit;

/// Tenant-bound authenticated encryption
pub mod crypto;

/// Tenant security tokens
pub mod token;

/// Security orchestration service
pub mod service;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::access::*;
    pub use crate::activity::*;
    pub use crate::audit::*;
    pub use crate::boundary::*;
    pub use crate::clock::*;
    pub use crate::config::*;
    pub use crate::context::*;
    pub use crate::crypto::*;
    pub use crate::error::*;
    pub use crate::ownership::*;
    pub use crate::risk::*;
    pub use crate::service::*;
    pub use crate::token::*;
}
