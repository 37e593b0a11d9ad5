//! Tenant-bound authenticated encryption.

mod cipher;
mod keyring;

pub use cipher::{ALGORITHM, EncryptedPayload, NONCE_SIZE, TAG_SIZE, TenantCipher};
pub use keyring::{KEY_SIZE, KeyMaterial, TenantKeyring};
