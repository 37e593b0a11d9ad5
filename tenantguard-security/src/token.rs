//! Signed tenant security tokens.
//!
//! A token is `base64url(claims JSON) "." base64url(HMAC-SHA256(first segment))`.
//! Verification checks structure, then the signature in constant time, then
//! expiry.

use crate::config::{MIN_SECRET_LEN, SecretString};
use crate::error::{Result, SecurityError};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by a security token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityTokenClaims {
    /// Tenant the token is scoped to.
    pub tenant_id: String,
    /// Subject.
    pub user_id: String,
    /// Granted permissions.
    pub permissions: Vec<String>,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Unique token id.
    pub jti: String,
}

impl SecurityTokenClaims {
    /// Returns true if the token has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

/// Issues and verifies security tokens with a shared secret.
pub struct TokenSigner {
    secret: Zeroizing<Vec<u8>>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSigner {
    /// Creates a signer.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the secret is shorter than 32 bytes.
    pub fn new(secret: &SecretString, ttl: Duration) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(SecurityError::configuration(format!(
                "token secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        Ok(Self {
            secret: Zeroizing::new(secret.as_bytes().to_vec()),
            ttl,
        })
    }

    /// Token lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Builds claims issued at `now` and expiring after the TTL.
    #[must_use]
    pub fn claims(
        &self,
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        permissions: Vec<String>,
        now: DateTime<Utc>,
    ) -> SecurityTokenClaims {
        SecurityTokenClaims {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            permissions,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Signs claims into a token.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be serialized.
    pub fn issue(&self, claims: &SecurityTokenClaims) -> Result<String> {
        let json = serde_json::to_vec(claims)
            .map_err(|e| SecurityError::token_malformed(format!("claims serialization: {e}")))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = URL_SAFE_NO_PAD.encode(self.mac(payload.as_bytes())?.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    /// Verifies a token at `now` and returns its claims.
    ///
    /// # Errors
    ///
    /// - `TokenMalformed` if the token does not have two base64url segments
    ///   or the claims are not valid JSON
    /// - `TokenSignatureMismatch` if the signature does not verify
    /// - `TokenExpired` if `exp` is not after `now`
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SecurityTokenClaims> {
        let (payload, signature) = token
            .split_once('.')
            .filter(|(p, s)| !p.is_empty() && !s.is_empty() && !s.contains('.'))
            .ok_or_else(|| SecurityError::token_malformed("expected two dot-separated segments"))?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SecurityError::token_malformed("signature is not base64url"))?;
        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| SecurityError::token_malformed("payload is not base64url"))?;

        self.mac(payload.as_bytes())?
            .verify_slice(&signature)
            .map_err(|_| SecurityError::TokenSignatureMismatch)?;

        let claims: SecurityTokenClaims = serde_json::from_slice(&json)
            .map_err(|e| SecurityError::token_malformed(format!("invalid claims: {e}")))?;

        if claims.is_expired(now) {
            return Err(SecurityError::TokenExpired);
        }
        Ok(claims)
    }

    fn mac(&self, data: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| SecurityError::configuration("Invalid HMAC key length"))?;
        mac.update(data);
        Ok(mac)
    }
}
