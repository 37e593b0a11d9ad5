//! Tamper-evident sealing of audit entries.
//!
//! Each seal is `HMAC-SHA256(sequence || previous seal || entry JSON)`, so
//! editing, removing or reordering a retained entry breaks the chain.

use super::entry::TenantAuditEntry;
use crate::error::{Result, SecurityError};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::borrow::Borrow;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// An audit entry as retained by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SealedAuditEntry {
    sequence: u64,
    entry: TenantAuditEntry,
    previous_seal: Option<String>,
    seal: Option<String>,
}

impl SealedAuditEntry {
    /// Wraps an entry without a seal.
    #[must_use]
    pub const fn unsealed(sequence: u64, entry: TenantAuditEntry) -> Self {
        Self {
            sequence,
            entry,
            previous_seal: None,
            seal: None,
        }
    }

    /// Position in the trail, starting at 0.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The audited entry.
    #[must_use]
    pub const fn entry(&self) -> &TenantAuditEntry {
        &self.entry
    }

    /// Seal of the preceding entry.
    #[must_use]
    pub fn previous_seal(&self) -> Option<&str> {
        self.previous_seal.as_deref()
    }

    /// Hex-encoded seal of this entry.
    #[must_use]
    pub fn seal(&self) -> Option<&str> {
        self.seal.as_deref()
    }
}

/// Computes and checks seals with a secret key.
pub struct AuditSealer {
    key: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for AuditSealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuditSealer([REDACTED])")
    }
}

impl AuditSealer {
    /// Creates a sealer.
    #[must_use]
    pub fn new(key: &[u8]) -> Self {
        Self {
            key: Zeroizing::new(key.to_vec()),
        }
    }

    /// Seals `entry` at `sequence`, chaining it to `previous_seal`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be serialized.
    pub fn seal(
        &self,
        sequence: u64,
        entry: TenantAuditEntry,
        previous_seal: Option<String>,
    ) -> Result<SealedAuditEntry> {
        let mac = self.mac(sequence, &entry, previous_seal.as_deref())?;
        Ok(SealedAuditEntry {
            sequence,
            entry,
            previous_seal,
            seal: Some(hex::encode(mac.finalize().into_bytes())),
        })
    }

    /// Verifies one entry's seal in constant time.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the entry is unsealed or its seal does not match.
    pub fn verify(&self, sealed: &SealedAuditEntry) -> Result<()> {
        let seal = sealed.seal().ok_or_else(|| {
            SecurityError::storage(format!("audit entry {} is not sealed", sealed.sequence))
        })?;
        let expected = hex::decode(seal).map_err(|_| {
            SecurityError::storage(format!("audit entry {} has a malformed seal", sealed.sequence))
        })?;
        self.mac(sealed.sequence, &sealed.entry, sealed.previous_seal())?
            .verify_slice(&expected)
            .map_err(|_| {
                SecurityError::storage(format!(
                    "audit entry {} failed seal verification",
                    sealed.sequence
                ))
            })
    }

    /// Verifies a run of entries: every seal, contiguous sequence numbers, and
    /// each entry linking to its predecessor's seal. Order of the input does
    /// not matter.
    ///
    /// # Errors
    ///
    /// Returns a storage error describing the first break in the chain.
    pub fn verify_chain<E: Borrow<SealedAuditEntry>>(&self, entries: &[E]) -> Result<()> {
        let mut ordered: Vec<&SealedAuditEntry> = entries
            .iter()
            .map(<E as Borrow<SealedAuditEntry>>::borrow)
            .collect();
        ordered.sort_by_key(|e| e.sequence);

        for (i, sealed) in ordered.iter().enumerate() {
            self.verify(sealed)?;
            if i == 0 {
                continue;
            }
            let previous = ordered[i - 1];
            if sealed.sequence != previous.sequence + 1 {
                return Err(SecurityError::storage(format!(
                    "audit chain gap between {} and {}",
                    previous.sequence, sealed.sequence
                )));
            }
            if sealed.previous_seal() != previous.seal() {
                return Err(SecurityError::storage(format!(
                    "audit entry {} does not link to its predecessor",
                    sealed.sequence
                )));
            }
        }
        Ok(())
    }

    fn mac(
        &self,
        sequence: u64,
        entry: &TenantAuditEntry,
        previous_seal: Option<&str>,
    ) -> Result<HmacSha256> {
        let json = entry
            .canonical_json()
            .map_err(|e| SecurityError::storage(format!("audit entry serialization: {e}")))?;
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|_| SecurityError::configuration("Invalid HMAC key length"))?;
        mac.update(&sequence.to_be_bytes());
        mac.update(previous_seal.unwrap_or_default().as_bytes());
        mac.update(&json);
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditEventKind;
    use chrono::Utc;

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn entry(user: &str) -> TenantAuditEntry {
        TenantAuditEntry::builder(AuditEventKind::TenantAccessGranted, "t1", user, "read")
            .success(true)
            .build(Utc::now())
    }

    fn chain(sealer: &AuditSealer, n: u64) -> Vec<SealedAuditEntry> {
        let mut out: Vec<SealedAuditEntry> = Vec::new();
        for i in 0..n {
            let previous = out.last().and_then(|e| e.seal().map(ToString::to_string));
            out.push(sealer.seal(i, entry(&format!("u{i}")), previous).unwrap());
        }
        out
    }

    #[test]
    fn test_chain_verifies_in_any_order() {
        let sealer = AuditSealer::new(KEY);
        let mut entries = chain(&sealer, 5);
        assert!(sealer.verify_chain(&entries).is_ok());

        entries.reverse();
        assert!(sealer.verify_chain(&entries).is_ok());
    }

    #[test]
    fn test_tampered_entry_detected() {
        let sealer = AuditSealer::new(KEY);
        let mut entries = chain(&sealer, 3);
        let forged = entry("mallory");
        entries[1].entry = forged;

        let err = sealer.verify_chain(&entries).unwrap_err();
        assert!(err.to_string().contains("entry 1"));
    }

    #[test]
    fn test_removed_entry_detected() {
        let sealer = AuditSealer::new(KEY);
        let mut entries = chain(&sealer, 4);
        entries.remove(2);

        let err = sealer.verify_chain(&entries).unwrap_err();
        assert!(err.to_string().contains("gap"));
    }

    #[test]
    fn test_trailing_window_verifies() {
        let sealer = AuditSealer::new(KEY);
        let entries = chain(&sealer, 6);
        assert!(sealer.verify_chain(&entries[3..]).is_ok());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let entries = chain(&AuditSealer::new(KEY), 2);
        let other = AuditSealer::new(b"ffffffffffffffffffffffffffffffff");
        assert!(other.verify_chain(&entries).is_err());
    }

    #[test]
    fn test_unsealed_rejected() {
        let sealer = AuditSealer::new(KEY);
        let unsealed = SealedAuditEntry::unsealed(0, entry("u1"));
        assert!(sealer.verify(&unsealed).is_err());
    }
}
