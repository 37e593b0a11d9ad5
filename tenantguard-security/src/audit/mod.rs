//! Audit trail for security decisions.
//!
//! Every decision of the security core appends exactly one
//! [`TenantAuditEntry`]. Entries are immutable once built, retained in a
//! bounded store, optionally sealed into an HMAC chain, and forwarded to the
//! log sink.

mod entry;
mod seal;
mod store;
mod trail;

pub use entry::{AuditEntryBuilder, AuditEventKind, SecurityLevel, TenantAuditEntry};
pub use seal::{AuditSealer, SealedAuditEntry};
pub use store::{AuditFilter, AuditStore, DEFAULT_AUDIT_CAPACITY, InMemoryAuditStore};
pub use trail::AuditTrail;
