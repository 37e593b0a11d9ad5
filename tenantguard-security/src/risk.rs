//! Risk scoring.
//!
//! Pure functions mapping a decision's inputs to a score in `0..=10`. Scores
//! enrich the audit trail and feed alerting; they never gate a decision.

use crate::context::{DataClassification, DataOperation};
use crate::error::SecurityError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A risk score clamped to `0..=10`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct RiskScore(u8);

impl RiskScore {
    /// Lowest score.
    pub const MIN: Self = Self(0);
    /// Highest score.
    pub const MAX: Self = Self(10);

    /// Creates a score, clamping into `0..=10`.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Self(u8::try_from(value.min(u32::from(Self::MAX.0))).unwrap_or(Self::MAX.0))
    }

    /// Numeric value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Adds `delta`, saturating at the maximum.
    #[must_use]
    pub fn saturating_add(self, delta: u32) -> Self {
        Self::new(u32::from(self.0).saturating_add(delta))
    }
}

impl TryFrom<u8> for RiskScore {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > Self::MAX.0 {
            return Err(format!("risk score {value} exceeds {}", Self::MAX.0));
        }
        Ok(Self(value))
    }
}

impl From<RiskScore> for u8 {
    fn from(score: RiskScore) -> Self {
        score.0
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Weight of a classification tier.
#[must_use]
pub const fn classification_weight(classification: DataClassification) -> u32 {
    match classification {
        DataClassification::Public => 0,
        DataClassification::Internal => 2,
        DataClassification::Confidential => 4,
        DataClassification::Restricted => 6,
        DataClassification::TopSecret => 10,
    }
}

/// Weight of an operation.
#[must_use]
pub const fn operation_weight(operation: DataOperation) -> u32 {
    match operation {
        DataOperation::Read => 1,
        DataOperation::Write | DataOperation::Update => 3,
        DataOperation::Delete => 5,
        DataOperation::Bulk => 6,
        DataOperation::Export => 8,
    }
}

/// Risk of a data access.
#[must_use]
pub fn data_access_risk(classification: DataClassification, operation: DataOperation) -> RiskScore {
    RiskScore::new(classification_weight(classification) + operation_weight(operation))
}

/// Base risk of every cross-tenant request.
pub const CROSS_TENANT_BASE: u32 = 5;

/// Operations adding to cross-tenant risk.
pub const HIGH_RISK_CROSS_TENANT_OPERATIONS: [&str; 2] = ["data_export", "bulk_operation"];

/// Risk of a cross-tenant request given the user's recent tenant switches.
#[must_use]
pub fn cross_tenant_risk(operation: &str, recent_switches: u32) -> RiskScore {
    let mut score = CROSS_TENANT_BASE;
    if HIGH_RISK_CROSS_TENANT_OPERATIONS.contains(&operation) {
        score += 3;
    }
    if recent_switches > 2 {
        score += 2;
    }
    RiskScore::new(score)
}

/// Risk recorded for a denial, escalating `base` by the severity of `error`.
#[must_use]
pub fn denial_risk(base: RiskScore, error: &SecurityError) -> RiskScore {
    match error {
        SecurityError::InvalidContext { .. } => RiskScore::new(9),
        SecurityError::IsolationViolation { .. } => base.max(RiskScore::new(8)),
        SecurityError::SuspiciousActivity { .. } => base.max(RiskScore::new(9)),
        SecurityError::AccessDenied { .. } => base.saturating_add(2),
        SecurityError::Encryption { .. }
        | SecurityError::Decryption { .. }
        | SecurityError::KeyNotFound { .. } => base.max(RiskScore::new(8)),
        SecurityError::TokenMalformed { .. }
        | SecurityError::TokenExpired
        | SecurityError::TokenSignatureMismatch => base.max(RiskScore::new(6)),
        SecurityError::Storage { .. } | SecurityError::Configuration { .. } => RiskScore::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_data_access_weights() {
        assert_eq!(
            data_access_risk(DataClassification::Public, DataOperation::Read).value(),
            1
        );
        assert_eq!(
            data_access_risk(DataClassification::Confidential, DataOperation::Delete).value(),
            9
        );
        assert_eq!(
            data_access_risk(DataClassification::TopSecret, DataOperation::Export),
            RiskScore::MAX
        );
    }

    #[test]
    fn test_cross_tenant() {
        assert_eq!(cross_tenant_risk("tenant_support", 0).value(), 5);
        assert_eq!(cross_tenant_risk("data_export", 0).value(), 8);
        assert_eq!(cross_tenant_risk("tenant_support", 3).value(), 7);
        assert_eq!(cross_tenant_risk("bulk_operation", 3).value(), 10);
        assert_eq!(cross_tenant_risk("tenant_support", 2).value(), 5);
    }

    #[test]
    fn test_denial_escalation() {
        let base = RiskScore::new(3);
        assert_eq!(
            denial_risk(base, &SecurityError::invalid_context("x")).value(),
            9
        );
        assert_eq!(
            denial_risk(base, &SecurityError::isolation_violation("x")).value(),
            8
        );
        assert_eq!(
            denial_risk(base, &SecurityError::access_denied("u", "x")).value(),
            5
        );
        assert_eq!(
            denial_risk(base, &SecurityError::storage("x")),
            RiskScore::MAX
        );
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        assert!(serde_json::from_str::<RiskScore>("11").is_err());
        assert_eq!(serde_json::from_str::<RiskScore>("7").unwrap().value(), 7);
    }

    fn classification() -> impl Strategy<Value = DataClassification> {
        proptest::sample::select(DataClassification::ALL.to_vec())
    }

    fn operation() -> impl Strategy<Value = DataOperation> {
        proptest::sample::select(DataOperation::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_scores_within_bounds(
            c in classification(),
            op in operation(),
            name in "[a-z_]{0,16}",
            switches in any::<u32>(),
            raw in any::<u32>(),
            delta in any::<u32>(),
        ) {
            let access = data_access_risk(c, op);
            prop_assert!(access <= RiskScore::MAX);
            prop_assert!(cross_tenant_risk(&name, switches) <= RiskScore::MAX);
            prop_assert!(RiskScore::new(raw).saturating_add(delta) <= RiskScore::MAX);

            for error in [
                SecurityError::invalid_context("x"),
                SecurityError::isolation_violation("x"),
                SecurityError::access_denied("u", "x"),
                SecurityError::suspicious_activity("u", "x"),
                SecurityError::storage("x"),
            ] {
                let denied = denial_risk(access, &error);
                prop_assert!(denied <= RiskScore::MAX);
            }
        }
    }
}
