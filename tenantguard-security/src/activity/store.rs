//! Activity storage interface.

use super::tracker::{ActivityAssessment, ActivityState, CrossTenantRequestRecord};
use crate::config::ActivitySettings;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Records between sweeps of idle users.
pub const DEFAULT_PRUNE_INTERVAL: usize = 1024;

/// Storage for per-user cross-tenant activity.
///
/// `record_and_assess` must update and assess a user's state atomically.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Records a request for `user_id` and returns the assessment.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn record_and_assess(
        &self,
        user_id: &str,
        record: CrossTenantRequestRecord,
    ) -> Result<ActivityAssessment>;

    /// Returns a copy of a user's state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn snapshot(&self, user_id: &str) -> Result<Option<ActivityState>>;

    /// Forgets a user's state, returning whether any existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn reset(&self, user_id: &str) -> Result<bool>;
}

/// In-memory activity store keyed by user id.
///
/// Users whose last request has left the window are swept every
/// `prune_interval` records.
#[derive(Debug)]
pub struct InMemoryActivityStore {
    settings: ActivitySettings,
    users: DashMap<String, ActivityState>,
    prune_interval: usize,
    records: AtomicUsize,
}

impl Default for InMemoryActivityStore {
    fn default() -> Self {
        Self::new(ActivitySettings::default())
    }
}

impl InMemoryActivityStore {
    /// Creates a store applying the given thresholds.
    #[must_use]
    pub fn new(settings: ActivitySettings) -> Self {
        Self {
            settings,
            users: DashMap::new(),
            prune_interval: DEFAULT_PRUNE_INTERVAL,
            records: AtomicUsize::new(0),
        }
    }

    /// Sets how many records pass between sweeps (at least one).
    #[must_use]
    pub fn with_prune_interval(mut self, interval: usize) -> Self {
        self.prune_interval = interval.max(1);
        self
    }

    /// Number of tracked users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Drops users idle at `now`, returning how many were removed.
    pub fn prune_idle(&self, now: DateTime<Utc>) -> usize {
        let before = self.users.len();
        self.users.retain(|_, state| !state.is_idle(now, &self.settings));
        let removed = before.saturating_sub(self.users.len());
        if removed > 0 {
            debug!(removed, remaining = self.users.len(), "Pruned idle activity state");
        }
        removed
    }
}

#[async_trait]
impl ActivityStore for InMemoryActivityStore {
    async fn record_and_assess(
        &self,
        user_id: &str,
        record: CrossTenantRequestRecord,
    ) -> Result<ActivityAssessment> {
        if (self.records.fetch_add(1, Ordering::Relaxed) + 1) % self.prune_interval == 0 {
            self.prune_idle(record.at);
        }
        let mut state = self.users.entry(user_id.to_string()).or_default();
        Ok(state.record(record, &self.settings))
    }

    async fn snapshot(&self, user_id: &str) -> Result<Option<ActivityState>> {
        Ok(self.users.get(user_id).map(|s| s.value().clone()))
    }

    async fn reset(&self, user_id: &str) -> Result<bool> {
        Ok(self.users.remove(user_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn request(minutes: i64, target: &str) -> CrossTenantRequestRecord {
        CrossTenantRequestRecord {
            at: Utc::now() + Duration::minutes(minutes),
            source_tenant: "t0".to_string(),
            target_tenant: target.to_string(),
            operation: "tenant_support".to_string(),
        }
    }

    #[tokio::test]
    async fn test_users_tracked_independently() {
        let store = InMemoryActivityStore::new(ActivitySettings::default());
        for i in 0..4 {
            store.record_and_assess("u1", request(i, "t1")).await.unwrap();
        }
        let other = store.record_and_assess("u2", request(4, "t1")).await.unwrap();
        assert_eq!(other.consecutive_switches, 1);

        let snapshot = store.snapshot("u1").await.unwrap().unwrap();
        assert_eq!(snapshot.consecutive_switches(), 4);
        assert_eq!(store.user_count(), 2);

        assert!(store.reset("u1").await.unwrap());
        assert!(store.snapshot("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_recording() {
        let store = Arc::new(InMemoryActivityStore::new(ActivitySettings::default()));
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .record_and_assess("u1", request(0, &format!("t{i}")))
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = store.snapshot("u1").await.unwrap().unwrap();
        assert_eq!(snapshot.history().count(), 8);
    }

    #[tokio::test]
    async fn test_idle_users_are_pruned() {
        let store = InMemoryActivityStore::new(ActivitySettings::default()).with_prune_interval(2);
        store.record_and_assess("u1", request(0, "t1")).await.unwrap();
        assert_eq!(store.user_count(), 1);

        // Second record triggers a sweep; u1's only request is two hours old.
        store.record_and_assess("u2", request(120, "t1")).await.unwrap();
        assert_eq!(store.user_count(), 1);
        assert!(store.snapshot("u1").await.unwrap().is_none());
        assert!(store.snapshot("u2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_active_users_survive_prune() {
        let store = InMemoryActivityStore::new(ActivitySettings::default());
        store.record_and_assess("u1", request(0, "t1")).await.unwrap();
        assert_eq!(store.prune_idle(Utc::now() + Duration::minutes(30)), 0);
        assert_eq!(store.prune_idle(Utc::now() + Duration::minutes(90)), 1);
        assert_eq!(store.user_count(), 0);
    }
}
