//! TTL cache of access decisions.
//!
//! Entries expire lazily when read. A revoked permission keeps granting until
//! the cached decision for that key expires.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::context::DataOperation;

/// Cache key: (tenant, user, resource type, operation).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessCacheKey {
    /// Tenant id.
    pub tenant_id: String,
    /// User id.
    pub user_id: String,
    /// Resource type.
    pub resource_type: String,
    /// Operation.
    pub operation: DataOperation,
}

impl AccessCacheKey {
    /// Creates a key.
    #[must_use]
    pub fn new(
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        resource_type: impl Into<String>,
        operation: DataOperation,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            resource_type: resource_type.into(),
            operation,
        }
    }
}

/// Outcome of the permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    /// Whether access is permitted.
    pub allowed: bool,
    /// Why access was refused.
    pub reason: Option<String>,
}

impl AccessDecision {
    /// A granting decision.
    #[must_use]
    pub const fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// A refusing decision.
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedDecision {
    decision: AccessDecision,
    expires_at: DateTime<Utc>,
}

/// Access decision cache with a fixed TTL.
#[derive(Debug)]
pub struct AccessDecisionCache {
    ttl: Duration,
    entries: Mutex<HashMap<AccessCacheKey, CachedDecision>>,
}

impl AccessDecisionCache {
    /// Creates a cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached decision if present and unexpired at `now`.
    #[must_use]
    pub fn get(&self, key: &AccessCacheKey, now: DateTime<Utc>) -> Option<AccessDecision> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(cached) if cached.expires_at > now => Some(cached.decision.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores a decision computed at `now`.
    pub fn insert(&self, key: AccessCacheKey, decision: AccessDecision, now: DateTime<Utc>) {
        self.entries.lock().insert(
            key,
            CachedDecision {
                decision,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Drops every entry expired at `now`, returning how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, cached| cached.expires_at > now);
        before - entries.len()
    }

    /// Number of entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
