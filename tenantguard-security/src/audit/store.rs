//! Audit storage interface and the bounded in-memory store.

use super::entry::AuditEventKind;
use super::seal::SealedAuditEntry;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

/// Default number of retained entries.
pub const DEFAULT_AUDIT_CAPACITY: usize = 100_000;

/// Filter for querying audit entries.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Only entries of this tenant.
    pub tenant_id: Option<String>,
    /// Only entries of this user.
    pub user_id: Option<String>,
    /// Only entries of this kind.
    pub kind: Option<AuditEventKind>,
    /// Only successful or only failed decisions.
    pub success: Option<bool>,
    /// Entries at or after this time.
    pub start_time: Option<DateTime<Utc>>,
    /// Entries at or before this time.
    pub end_time: Option<DateTime<Utc>>,
    /// Maximum number of entries returned.
    pub limit: Option<usize>,
}

impl AuditFilter {
    /// Creates a filter matching everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to one tenant.
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Restricts to one user.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Restricts to one event kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: AuditEventKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restricts to successful or failed decisions.
    #[must_use]
    pub const fn with_success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    /// Restricts to an inclusive time range.
    #[must_use]
    pub const fn with_time_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// Caps the number of results.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if the entry passes every set criterion.
    #[must_use]
    pub fn matches(&self, sealed: &SealedAuditEntry) -> bool {
        let entry = sealed.entry();
        self.tenant_id.as_deref().is_none_or(|t| entry.tenant_id() == t)
            && self.user_id.as_deref().is_none_or(|u| entry.user_id() == u)
            && self.kind.is_none_or(|k| entry.kind() == k)
            && self.success.is_none_or(|s| entry.success() == s)
            && self.start_time.is_none_or(|t| entry.timestamp() >= t)
            && self.end_time.is_none_or(|t| entry.timestamp() <= t)
    }
}

/// Trait for audit storage backends.
///
/// Entries are append-only: a backend never mutates a stored entry and only
/// drops entries to honour its capacity, oldest first.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Appends an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn append(&self, entry: SealedAuditEntry) -> Result<()>;

    /// Queries entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn query(&self, filter: &AuditFilter) -> Result<Vec<Arc<SealedAuditEntry>>>;

    /// Retrieves an entry by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn get(&self, id: Uuid) -> Result<Option<Arc<SealedAuditEntry>>>;

    /// Number of retained entries.
    fn len(&self) -> usize;

    /// Returns true if nothing is retained.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of retained entries.
    fn capacity(&self) -> usize;
}

/// Bounded in-memory ring buffer of audit entries.
#[derive(Debug)]
pub struct InMemoryAuditStore {
    capacity: usize,
    entries: Mutex<VecDeque<Arc<SealedAuditEntry>>>,
}

impl InMemoryAuditStore {
    /// Creates a store with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_CAPACITY)
    }

    /// Creates a store retaining at most `capacity` entries (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
        }
    }
}

impl Default for InMemoryAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: SealedAuditEntry) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(Arc::new(entry));
        Ok(())
    }

    async fn query(&self, filter: &AuditFilter) -> Result<Vec<Arc<SealedAuditEntry>>> {
        let entries = self.entries.lock();
        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(entries
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Arc<SealedAuditEntry>>> {
        Ok(self
            .entries
            .lock()
            .iter()
            .rev()
            .find(|e| e.entry().id() == id)
            .cloned())
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
