//! Versioned encryption keys.

use crate::error::{Result, SecurityError};
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use std::collections::HashMap;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// Raw key bytes, zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial([u8; KEY_SIZE]);

impl KeyMaterial {
    /// Wraps raw key bytes.
    #[must_use]
    pub const fn new(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Decodes a hex-encoded 256-bit key.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the input is not hex or not 32 bytes.
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            hex::decode(hex_key.trim())
                .map_err(|_| SecurityError::configuration("encryption key must be hex encoded"))?,
        );
        let key: [u8; KEY_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            SecurityError::configuration(format!("encryption key must be {KEY_SIZE} bytes"))
        })?;
        Ok(Self(key))
    }

    /// Generates a random key.
    ///
    /// # Errors
    ///
    /// Returns an error if the system RNG fails.
    pub fn generate() -> Result<Self> {
        let mut key = [0u8; KEY_SIZE];
        SystemRandom::new()
            .fill(&mut key)
            .map_err(|_| SecurityError::encryption("Failed to generate random key"))?;
        Ok(Self(key))
    }

    pub(crate) const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial([REDACTED])")
    }
}

#[derive(Debug, Clone)]
struct VersionedKey {
    material: KeyMaterial,
    created_at: DateTime<Utc>,
}

/// Keys by id, one of which is active for new encryptions.
///
/// Retired keys stay available for decryption.
#[derive(Debug, Clone)]
pub struct TenantKeyring {
    active: String,
    keys: HashMap<String, VersionedKey>,
}

impl TenantKeyring {
    /// Creates a keyring with a single active key.
    #[must_use]
    pub fn new(key_id: impl Into<String>, material: KeyMaterial, created_at: DateTime<Utc>) -> Self {
        let key_id = key_id.into();
        let mut keys = HashMap::new();
        keys.insert(
            key_id.clone(),
            VersionedKey {
                material,
                created_at,
            },
        );
        Self {
            active: key_id,
            keys,
        }
    }

    /// Id of the active key.
    #[must_use]
    pub fn active_key_id(&self) -> &str {
        &self.active
    }

    /// Active key id and material.
    #[must_use]
    pub fn active(&self) -> (&str, &KeyMaterial) {
        // The active id always has an entry: it is only set alongside an insert.
        let material = &self.keys[&self.active].material;
        (&self.active, material)
    }

    /// Looks up a key by id.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if no key has this id.
    pub fn key(&self, key_id: &str) -> Result<&KeyMaterial> {
        self.keys
            .get(key_id)
            .map(|k| &k.material)
            .ok_or_else(|| SecurityError::key_not_found(key_id))
    }

    /// Installs a new active key, keeping the previous ones for decryption.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the id is already in use.
    pub fn rotate(
        &mut self,
        key_id: impl Into<String>,
        material: KeyMaterial,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let key_id = key_id.into();
        if self.keys.contains_key(&key_id) {
            return Err(SecurityError::configuration(format!(
                "key id '{key_id}' already exists"
            )));
        }
        self.keys.insert(
            key_id.clone(),
            VersionedKey {
                material,
                created_at: now,
            },
        );
        self.active = key_id;
        Ok(())
    }

    /// Returns true if the active key is at least `rotation_days` old.
    #[must_use]
    pub fn needs_rotation(&self, now: DateTime<Utc>, rotation_days: u32) -> bool {
        let created_at = self.keys[&self.active].created_at;
        now - created_at >= Duration::days(i64::from(rotation_days))
    }

    /// Ids of every retained key.
    #[must_use]
    pub fn key_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
