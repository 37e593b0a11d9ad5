//! Closed vocabularies shared by every security decision.

use crate::error::{Result, SecurityError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! impl_str_enum {
    ($ty:ty, $label:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = SecurityError;

            fn from_str(s: &str) -> Result<Self> {
                let needle = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(needle))
                    .ok_or_else(|| {
                        SecurityError::invalid_context(format!("unknown {}: '{}'", $label, s))
                    })
            }
        }
    };
}

/// Requester role. Ordered `User < Admin < SuperAdmin`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular tenant user.
    #[default]
    User,
    /// Tenant administrator.
    Admin,
    /// Platform operator.
    SuperAdmin,
}

impl Role {
    /// Every role, lowest first.
    pub const ALL: [Self; 3] = [Self::User, Self::Admin, Self::SuperAdmin];

    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Returns true if this role is at or above `minimum`.
    #[must_use]
    pub fn satisfies(self, minimum: Self) -> bool {
        self >= minimum
    }
}

impl_str_enum!(Role, "role");

/// Strictness of data separation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// Resource never leaves its tenant.
    #[default]
    Strict,
    /// Shared only through explicit policy.
    Controlled,
    /// Shared between cooperating tenants.
    Shared,
    /// Visible to everyone.
    Public,
}

impl IsolationLevel {
    /// Every isolation level, strictest first.
    pub const ALL: [Self; 4] = [Self::Strict, Self::Controlled, Self::Shared, Self::Public];

    /// Wire name of the level.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Controlled => "controlled",
            Self::Shared => "shared",
            Self::Public => "public",
        }
    }
}

impl_str_enum!(IsolationLevel, "isolation level");

/// Sensitivity tier of a resource.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DataClassification {
    /// Public data.
    Public,
    /// Internal business data.
    #[default]
    Internal,
    /// Confidential data.
    Confidential,
    /// Restricted data, encrypted on access.
    Restricted,
    /// Highest tier, encrypted on access.
    TopSecret,
}

impl DataClassification {
    /// Every classification, least sensitive first.
    pub const ALL: [Self; 5] = [
        Self::Public,
        Self::Internal,
        Self::Confidential,
        Self::Restricted,
        Self::TopSecret,
    ];

    /// Wire name of the classification.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Internal => "internal",
            Self::Confidential => "confidential",
            Self::Restricted => "restricted",
            Self::TopSecret => "top_secret",
        }
    }

    /// Returns true if payloads of this tier must be encrypted.
    #[must_use]
    pub const fn requires_encryption(&self) -> bool {
        matches!(self, Self::Restricted | Self::TopSecret)
    }
}

impl_str_enum!(DataClassification, "data classification");

/// Operation performed on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOperation {
    /// Read.
    Read,
    /// Create or overwrite.
    Write,
    /// Partial update.
    Update,
    /// Delete.
    Delete,
    /// Export out of the platform.
    Export,
    /// Bulk operation over many resources.
    Bulk,
}

impl DataOperation {
    /// Every operation.
    pub const ALL: [Self; 6] = [
        Self::Read,
        Self::Write,
        Self::Update,
        Self::Delete,
        Self::Export,
        Self::Bulk,
    ];

    /// Wire name of the operation, as used in permission strings.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Export => "export",
            Self::Bulk => "bulk",
        }
    }
}

impl_str_enum!(DataOperation, "data operation");
