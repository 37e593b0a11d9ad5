//! Security decision metrics.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// Metric name for access decisions.
pub const ACCESS_DECISIONS: &str = "tenantguard_access_decisions_total";
/// Metric name for isolation boundary violations.
pub const ISOLATION_VIOLATIONS: &str = "tenantguard_isolation_violations_total";
/// Metric name for cross-tenant validation requests.
pub const CROSS_TENANT_REQUESTS: &str = "tenantguard_cross_tenant_requests_total";
/// Metric name for suspicious activity detections.
pub const SUSPICIOUS_ACTIVITY: &str = "tenantguard_suspicious_activity_total";
/// Metric name for critical alerts.
pub const CRITICAL_ALERTS: &str = "tenantguard_critical_alerts_total";
/// Metric name for the risk score distribution.
pub const RISK_SCORE: &str = "tenantguard_risk_score";
/// Metric name for retained audit entries.
pub const AUDIT_ENTRIES: &str = "tenantguard_audit_entries";
/// Metric name for token verifications.
pub const TOKEN_VERIFICATIONS: &str = "tenantguard_token_verifications_total";
/// Metric name for encryption operations.
pub const CRYPTO_OPERATIONS: &str = "tenantguard_crypto_operations_total";

/// Pre-defined metrics for the tenant security core.
///
/// Labels never carry tenant or user identifiers to keep cardinality bounded.
pub struct SecurityMetrics;

impl SecurityMetrics {
    /// Register all metric descriptions.
    pub fn register() {
        describe_counter!(ACCESS_DECISIONS, "Data access decisions by outcome and event");
        describe_counter!(ISOLATION_VIOLATIONS, "Tenant isolation boundary violations");
        describe_counter!(CROSS_TENANT_REQUESTS, "Cross-tenant access validations by outcome");
        describe_counter!(SUSPICIOUS_ACTIVITY, "Cross-tenant calls flagged as suspicious");
        describe_counter!(CRITICAL_ALERTS, "Critical security alerts raised");
        describe_histogram!(RISK_SCORE, "Risk score attached to audited decisions");
        describe_gauge!(AUDIT_ENTRIES, "Audit entries currently retained in memory");
        describe_counter!(TOKEN_VERIFICATIONS, "Security token verifications by result");
        describe_counter!(CRYPTO_OPERATIONS, "Tenant data encryption operations by result");
    }

    /// Record a data access decision.
    pub fn access_decision(allowed: bool, event: &str) {
        counter!(
            ACCESS_DECISIONS,
            "decision" => decision_label(allowed),
            "event" => event.to_string()
        )
        .increment(1);
    }

    /// Record an isolation boundary violation.
    pub fn isolation_violation() {
        counter!(ISOLATION_VIOLATIONS).increment(1);
    }

    /// Record a cross-tenant validation.
    pub fn cross_tenant_request(allowed: bool) {
        counter!(CROSS_TENANT_REQUESTS, "decision" => decision_label(allowed)).increment(1);
    }

    /// Record a suspicious activity detection.
    pub fn suspicious_activity() {
        counter!(SUSPICIOUS_ACTIVITY).increment(1);
    }

    /// Record a critical alert.
    pub fn critical_alert() {
        counter!(CRITICAL_ALERTS).increment(1);
    }

    /// Record the risk score of an audited decision.
    pub fn risk_score(score: u8) {
        histogram!(RISK_SCORE).record(f64::from(score));
    }

    /// Set the number of retained audit entries.
    #[allow(clippy::cast_precision_loss)]
    pub fn audit_entries(count: usize) {
        gauge!(AUDIT_ENTRIES).set(count as f64);
    }

    /// Record a token verification result ("valid", "expired", "malformed", "signature").
    pub fn token_verification(result: &'static str) {
        counter!(TOKEN_VERIFICATIONS, "result" => result).increment(1);
    }

    /// Record an encryption or decryption attempt.
    pub fn crypto_operation(operation: &'static str, success: bool) {
        counter!(
            CRYPTO_OPERATIONS,
            "operation" => operation,
            "result" => if success { "ok" } else { "error" }
        )
        .increment(1);
    }
}

fn decision_label(allowed: bool) -> &'static str {
    if allowed { "allowed" } else { "denied" }
}
