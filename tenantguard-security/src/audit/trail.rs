//! Audit trail: sealing, storage, log forwarding and metrics.

use super::entry::{SecurityLevel, TenantAuditEntry};
use super::seal::{AuditSealer, SealedAuditEntry};
use super::store::{AuditFilter, AuditStore, InMemoryAuditStore};
use crate::config::AuditSettings;
use crate::error::{Result, SecurityError};
use std::borrow::Borrow;
use std::sync::Arc;
use tenantguard_telemetry::logging::AUDIT_TARGET;
use tenantguard_telemetry::masking::SensitiveDataMasker;
use tenantguard_telemetry::metrics::SecurityMetrics;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
struct ChainState {
    next_sequence: u64,
    last_seal: Option<String>,
}

/// Records audit entries.
///
/// When a sealing key is configured every entry is sealed into an HMAC chain
/// before it reaches the store. Appends are serialized, and the chain only
/// advances once the store has accepted an entry. Each entry is also emitted as a tracing event
/// under the `tenantguard::audit` target with free text masked.
pub struct AuditTrail {
    store: Arc<dyn AuditStore>,
    sealer: Option<AuditSealer>,
    chain: Mutex<ChainState>,
    forward_to_log: bool,
    masker: SensitiveDataMasker,
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("sealed", &self.sealer.is_some())
            .field("forward_to_log", &self.forward_to_log)
            .field("len", &self.store.len())
            .finish_non_exhaustive()
    }
}

impl AuditTrail {
    /// Creates a trail over an in-memory store sized from `settings`.
    #[must_use]
    pub fn new(settings: &AuditSettings) -> Self {
        Self::with_store(
            Arc::new(InMemoryAuditStore::with_capacity(settings.capacity)),
            settings,
        )
    }

    /// Creates a trail over a custom store.
    #[must_use]
    pub fn with_store(store: Arc<dyn AuditStore>, settings: &AuditSettings) -> Self {
        Self {
            store,
            sealer: settings
                .sealing_key
                .as_ref()
                .map(|key| AuditSealer::new(key.as_bytes())),
            chain: Mutex::new(ChainState::default()),
            forward_to_log: settings.forward_to_log,
            masker: SensitiveDataMasker::new(),
        }
    }

    /// Returns true if entries are sealed.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.sealer.is_some()
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }

    /// Records an entry and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if sealing or the store append fails.
    pub async fn record(&self, entry: TenantAuditEntry) -> Result<Uuid> {
        let id = entry.id();
        self.forward(&entry);
        SecurityMetrics::risk_score(entry.risk_score().value());

        let mut chain = self.chain.lock().await;
        let sequence = chain.next_sequence;
        let sealed = match &self.sealer {
            Some(sealer) => sealer.seal(sequence, entry, chain.last_seal.clone())?,
            None => SealedAuditEntry::unsealed(sequence, entry),
        };
        let seal = sealed.seal().map(ToString::to_string);

        self.store.append(sealed).await?;
        chain.next_sequence += 1;
        chain.last_seal = seal;
        drop(chain);

        SecurityMetrics::audit_entries(self.store.len());
        Ok(id)
    }

    /// Queries retained entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn query(&self, filter: &AuditFilter) -> Result<Vec<Arc<SealedAuditEntry>>> {
        self.store.query(filter).await
    }

    /// Retrieves an entry by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn get(&self, id: Uuid) -> Result<Option<Arc<SealedAuditEntry>>> {
        self.store.get(id).await
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns true if nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Verifies the seal chain over `entries`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if sealing is disabled, or a storage
    /// error describing the first break in the chain.
    pub fn verify_chain<E: Borrow<SealedAuditEntry>>(&self, entries: &[E]) -> Result<()> {
        self.sealer
            .as_ref()
            .ok_or_else(|| SecurityError::configuration("audit sealing is not enabled"))?
            .verify_chain(entries)
    }

    fn forward(&self, entry: &TenantAuditEntry) {
        if !self.forward_to_log {
            return;
        }
        let error_message = entry
            .error_message()
            .map(|m| self.masker.mask_string(m).into_owned());

        macro_rules! emit {
            ($level:ident) => {
                $level!(
                    target: AUDIT_TARGET,
                    entry_id = %entry.id(),
                    kind = %entry.kind(),
                    tenant_id = %entry.tenant_id(),
                    user_id = %entry.user_id(),
                    operation = %entry.operation(),
                    resource_type = entry.resource_type(),
                    success = entry.success(),
                    security_level = %entry.security_level(),
                    isolation_violation = entry.isolation_violation(),
                    risk_score = entry.risk_score().value(),
                    error = error_message.as_deref(),
                    "audit"
                )
            };
        }

        match entry.security_level() {
            SecurityLevel::Critical => emit!(error),
            _ if !entry.success() => emit!(warn),
            _ => emit!(info),
        }
    }
}
