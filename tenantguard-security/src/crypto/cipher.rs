//! Tenant-bound AES-256-GCM.
//!
//! The tenant id is the additional authenticated data of every payload, so a
//! ciphertext sealed for one tenant fails authentication under any other.

use super::keyring::{KeyMaterial, TenantKeyring};
use crate::config::EncryptionSettings;
use crate::error::{Result, SecurityError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use ring::aead::{self, Aad, BoundKey, Nonce, NonceSequence, OpeningKey, SealingKey, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// AES-256-GCM nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// AES-256-GCM tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Algorithm name recorded on payloads.
pub const ALGORITHM: &str = "AES-256-GCM";

/// An encrypted payload. Binary fields are base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// Id of the key that sealed the payload.
    pub key_id: String,
    /// Ciphertext without the tag.
    pub ciphertext: String,
    /// 96-bit nonce.
    pub iv: String,
    /// 128-bit authentication tag.
    pub auth_tag: String,
    /// AEAD algorithm name.
    pub algorithm: String,
}

struct SingleNonce {
    nonce: Option<[u8; NONCE_SIZE]>,
}

impl SingleNonce {
    const fn new(nonce: [u8; NONCE_SIZE]) -> Self {
        Self { nonce: Some(nonce) }
    }
}

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        self.nonce
            .take()
            .map(Nonce::assume_unique_for_key)
            .ok_or(ring::error::Unspecified)
    }
}

fn generate_nonce() -> Result<[u8; NONCE_SIZE]> {
    let mut nonce = [0u8; NONCE_SIZE];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| SecurityError::encryption("Failed to generate random nonce"))?;
    Ok(nonce)
}

/// Encrypts and decrypts payloads bound to a tenant.
pub struct TenantCipher {
    keyring: RwLock<TenantKeyring>,
}

impl std::fmt::Debug for TenantCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantCipher")
            .field("active_key_id", &self.active_key_id())
            .finish_non_exhaustive()
    }
}

impl TenantCipher {
    /// Creates a cipher over a keyring.
    #[must_use]
    pub fn new(keyring: TenantKeyring) -> Self {
        Self {
            keyring: RwLock::new(keyring),
        }
    }

    /// Creates a cipher from the configured master key.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the master key is not 32 hex-encoded bytes.
    pub fn from_settings(settings: &EncryptionSettings, now: DateTime<Utc>) -> Result<Self> {
        let material = KeyMaterial::from_hex(settings.master_key.expose())?;
        Ok(Self::new(TenantKeyring::new(
            settings.key_id.clone(),
            material,
            now,
        )))
    }

    /// Id of the key used for new payloads.
    #[must_use]
    pub fn active_key_id(&self) -> String {
        self.keyring.read().active_key_id().to_string()
    }

    /// Installs a new active key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key id is already in use.
    pub fn rotate(
        &self,
        key_id: impl Into<String>,
        material: KeyMaterial,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.keyring.write().rotate(key_id, material, now)
    }

    /// Returns true if the active key has reached the rotation age.
    #[must_use]
    pub fn needs_rotation(&self, now: DateTime<Utc>, rotation_days: u32) -> bool {
        self.keyring.read().needs_rotation(now, rotation_days)
    }

    /// Encrypts `plaintext` for `tenant_id`.
    ///
    /// # Errors
    ///
    /// Returns an encryption error if the nonce or the seal cannot be produced.
    pub fn encrypt(&self, tenant_id: &str, plaintext: &[u8]) -> Result<EncryptedPayload> {
        let nonce = generate_nonce()?;
        let keyring = self.keyring.read();
        let (key_id, material) = keyring.active();

        let unbound_key = UnboundKey::new(&aead::AES_256_GCM, material.as_bytes())
            .map_err(|_| SecurityError::encryption("Failed to create encryption key"))?;
        let mut sealing_key = SealingKey::new(unbound_key, SingleNonce::new(nonce));

        let mut in_out = plaintext.to_vec();
        let tag = sealing_key
            .seal_in_place_separate_tag(Aad::from(tenant_id.as_bytes()), &mut in_out)
            .map_err(|_| SecurityError::encryption("Encryption failed"))?;

        Ok(EncryptedPayload {
            key_id: key_id.to_string(),
            ciphertext: BASE64.encode(&in_out),
            iv: BASE64.encode(nonce),
            auth_tag: BASE64.encode(tag.as_ref()),
            algorithm: ALGORITHM.to_string(),
        })
    }

    /// Decrypts a payload sealed for `tenant_id`.
    ///
    /// # Errors
    ///
    /// Returns a decryption error if the algorithm or key id is unknown, a
    /// field is not valid base64 of the right length, or authentication fails
    /// (wrong tag, tampered ciphertext, or a different tenant id).
    pub fn decrypt(&self, tenant_id: &str, payload: &EncryptedPayload) -> Result<Vec<u8>> {
        if payload.algorithm != ALGORITHM {
            return Err(SecurityError::decryption(format!(
                "unsupported algorithm '{}'",
                payload.algorithm
            )));
        }

        let nonce: [u8; NONCE_SIZE] = decode_field("iv", &payload.iv)?
            .try_into()
            .map_err(|_| SecurityError::decryption("iv must be 12 bytes"))?;
        let tag = decode_field("auth_tag", &payload.auth_tag)?;
        if tag.len() != TAG_SIZE {
            return Err(SecurityError::decryption("auth_tag must be 16 bytes"));
        }
        let mut in_out = decode_field("ciphertext", &payload.ciphertext)?;
        in_out.extend_from_slice(&tag);

        let keyring = self.keyring.read();
        let material = keyring.key(&payload.key_id).map_err(|_| {
            SecurityError::decryption(format!("unknown key id '{}'", payload.key_id))
        })?;

        let unbound_key = UnboundKey::new(&aead::AES_256_GCM, material.as_bytes())
            .map_err(|_| SecurityError::decryption("Failed to create decryption key"))?;
        let mut opening_key = OpeningKey::new(unbound_key, SingleNonce::new(nonce));

        let plaintext = opening_key
            .open_in_place(Aad::from(tenant_id.as_bytes()), &mut in_out)
            .map_err(|_| SecurityError::decryption("authentication failed"))?;
        Ok(plaintext.to_vec())
    }

    /// Serializes `value` as JSON and encrypts it.
    ///
    /// # Errors
    ///
    /// Returns an encryption error if serialization or encryption fails.
    pub fn encrypt_json<T: Serialize>(&self, tenant_id: &str, value: &T) -> Result<EncryptedPayload> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| SecurityError::encryption(format!("payload serialization failed: {e}")))?;
        self.encrypt(tenant_id, &bytes)
    }

    /// Decrypts a payload and parses it as JSON.
    ///
    /// # Errors
    ///
    /// Returns a decryption error if decryption or parsing fails.
    pub fn decrypt_json<T: DeserializeOwned>(
        &self,
        tenant_id: &str,
        payload: &EncryptedPayload,
    ) -> Result<T> {
        let bytes = self.decrypt(tenant_id, payload)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| SecurityError::decryption(format!("payload is not valid JSON: {e}")))
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|_| SecurityError::decryption(format!("{name} is not valid base64")))
}
