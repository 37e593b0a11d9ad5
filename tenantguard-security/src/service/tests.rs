use super::*;
use crate::audit::SealedAuditEntry;
use crate::boundary::{ResourcePolicy, TenantSecurityBoundary};
use crate::clock::ManualClock;
use crate::config::SecretString;
use crate::context::{DataClassification, DataOperation};
use chrono::Duration;
use serde_json::json;

const TOKEN_SECRET: &str = "tenantguard-test-token-secret-0123456789";
const MASTER_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

fn config() -> SecurityConfig {
    SecurityConfig::with_secrets(TOKEN_SECRET, MASTER_KEY)
}

fn service_with(config: SecurityConfig) -> (TenantSecurityService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let service = TenantSecurityService::builder(config)
        .with_clock(Arc::clone(&clock) as Arc<dyn Clock>)
        .build()
        .unwrap();
    (service, clock)
}

fn service() -> (TenantSecurityService, Arc<ManualClock>) {
    service_with(config())
}

fn user(tenant: &str, user: &str, perms: &[&str]) -> ContextInput {
    ContextInput::new(tenant, user).with_permissions(perms.iter().copied())
}

async fn entries_of(service: &TenantSecurityService, kind: AuditEventKind) -> Vec<Arc<SealedAuditEntry>> {
    service
        .audit_trail()
        .query(&AuditFilter::new().with_kind(kind))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_granted_access_is_audited() {
    let (service, _) = service();
    let request = DataAccessRequest::new("t1:cart-1", "cart", DataOperation::Read)
        .with_data_fields(["items", "total"]);

    let outcome = service
        .enforce_data_access(request, user("t1", "u1", &["cart:read"]))
        .await;

    assert!(outcome.allowed, "{:?}", outcome.error);
    assert!(outcome.error.is_none());
    assert!(!outcome.isolation_violation);
    let context = outcome.security.unwrap();
    assert_eq!(context.isolation_level, IsolationLevel::Strict);
    assert_eq!(context.audit_entry_id, outcome.audit_entry_id);

    let stored = service
        .audit_trail()
        .get(outcome.audit_entry_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    let entry = stored.entry();
    assert_eq!(entry.kind(), AuditEventKind::TenantAccessGranted);
    assert!(entry.success());
    assert_eq!(entry.resource_type(), Some("cart"));
    assert_eq!(entry.data_fields().unwrap().len(), 2);
    assert_eq!(entry.risk_score(), outcome.risk_score);
    assert_eq!(outcome.risk_score, RiskScore::new(3));
}

#[tokio::test]
async fn test_missing_identity_is_denied() {
    let (service, _) = service();
    let request = DataAccessRequest::new("t1:cart-1", "cart", DataOperation::Read);
    let input = ContextInput {
        tenant_id: Some("t1".to_string()),
        ..ContextInput::default()
    };

    let outcome = service.enforce_data_access(request, input).await;

    assert!(!outcome.allowed);
    assert!(outcome.security.is_none());
    assert_eq!(outcome.risk_score, RiskScore::new(9));
    assert!(outcome.error.unwrap().contains("user_id"));

    let denied = entries_of(&service, AuditEventKind::TenantAccessDenied).await;
    assert_eq!(denied.len(), 1);
    assert_eq!(denied[0].entry().tenant_id(), "t1");
    assert_eq!(denied[0].entry().user_id(), UNKNOWN);
}

#[tokio::test]
async fn test_strict_resource_requires_strict_context() {
    let (service, _) = service();

    for level in [IsolationLevel::Controlled, IsolationLevel::Shared, IsolationLevel::Public] {
        let request = DataAccessRequest::new("t1:order-1", "order", DataOperation::Read);
        let input = user("t1", "u1", &["*:*"]).with_isolation(level);

        let outcome = service.enforce_data_access(request, input).await;

        assert!(!outcome.allowed);
        assert!(outcome.isolation_violation);
        assert!(outcome.error.unwrap().contains("strict isolation"));
        assert!(outcome.risk_score >= RiskScore::new(8));
    }

    let violations = entries_of(&service, AuditEventKind::IsolationBoundaryViolated).await;
    assert_eq!(violations.len(), 3);
    assert!(violations.iter().all(|e| e.entry().isolation_violation()));
}

#[tokio::test]
async fn test_shared_resource_allows_any_isolation() {
    let (service, _) = service();
    let request = DataAccessRequest::new("t1:sku-9", "product", DataOperation::Read);
    let input = user("t1", "u1", &[]).with_isolation(IsolationLevel::Public);

    let outcome = service.enforce_data_access(request, input).await;
    assert!(outcome.allowed, "{:?}", outcome.error);
}

#[tokio::test]
async fn test_foreign_resource_is_isolation_violation() {
    let (service, _) = service();
    let request = DataAccessRequest::new("t2:cart-1", "cart", DataOperation::Read);

    let outcome = service
        .enforce_data_access(request, user("t1", "u1", &["*:*"]))
        .await;

    assert!(!outcome.allowed);
    assert!(outcome.isolation_violation);
    assert!(outcome.error.unwrap().contains("does not belong to tenant t1"));
    assert_eq!(service.violation_count("t1", "u1"), 1);
}

#[tokio::test]
async fn test_sibling_tenant_resource_is_not_owned() {
    let (service, _) = service();

    let nested = service
        .enforce_data_access(
            DataAccessRequest::new("acme:eu:cart-1", "cart", DataOperation::Read),
            user("acme:eu", "eve", &["cart:read"]),
        )
        .await;
    assert!(!nested.allowed);
    assert!(nested.security.is_none());
    assert!(nested.error.unwrap().contains("must not contain ':'"));

    let sibling = service
        .enforce_data_access(
            DataAccessRequest::new("acme.eu:cart-1", "cart", DataOperation::Read),
            user("acme", "mallory", &["cart:read"]),
        )
        .await;
    assert!(!sibling.allowed);
    assert!(sibling.isolation_violation);
    assert!(sibling.error.unwrap().contains("does not belong to tenant acme"));

    let own = service
        .enforce_data_access(
            DataAccessRequest::new("acme.eu:cart-1", "cart", DataOperation::Read),
            user("acme.eu", "erin", &["cart:read"]),
        )
        .await;
    assert!(own.allowed, "{:?}", own.error);
}

#[tokio::test]
async fn test_nested_target_tenant_is_rejected() {
    let (service, _) = service();
    let outcome = service
        .validate_cross_tenant_access(
            CrossTenantRequest::new("t1", "t2:eu", "data_read"),
            user("t1", "u1", &[]),
        )
        .await;
    assert!(!outcome.allowed);
    assert!(outcome.error.unwrap().contains("target_tenant"));
}

#[tokio::test]
async fn test_repeated_violations_raise_critical_alert() {
    let (service, _) = service();
    let attempt = || {
        service.enforce_data_access(
            DataAccessRequest::new("t2:cart-1", "cart", DataOperation::Read),
            user("t1", "u1", &["*:*"]),
        )
    };

    for _ in 0..4 {
        attempt().await;
    }
    assert!(entries_of(&service, AuditEventKind::CriticalSecurityAlert).await.is_empty());

    attempt().await;
    let alerts = entries_of(&service, AuditEventKind::CriticalSecurityAlert).await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].entry().security_level(), SecurityLevel::Critical);
    assert_eq!(alerts[0].entry().risk_score(), RiskScore::MAX);

    attempt().await;
    assert_eq!(
        entries_of(&service, AuditEventKind::CriticalSecurityAlert).await.len(),
        2
    );
    assert_eq!(service.violation_count("t1", "u1"), 6);
    assert_eq!(service.violation_count("t1", "other"), 0);

    assert_eq!(service.reset_violations("t1", "u1"), 6);
    assert_eq!(service.violation_count("t1", "u1"), 0);
    attempt().await;
    assert_eq!(
        entries_of(&service, AuditEventKind::CriticalSecurityAlert).await.len(),
        2
    );
}

#[tokio::test]
async fn test_cart_write_without_permission_is_denied() {
    let (service, _) = service();
    let request = DataAccessRequest::new("t1:cart-1", "cart", DataOperation::Write);

    let outcome = service
        .enforce_data_access(request, user("t1", "u1", &["cart:read"]))
        .await;

    assert!(!outcome.allowed);
    assert!(!outcome.isolation_violation);
    assert!(outcome.error.unwrap().contains("Insufficient permissions"));
    assert_eq!(
        entries_of(&service, AuditEventKind::TenantAccessDenied).await.len(),
        1
    );
}

#[tokio::test]
async fn test_any_matching_grant_permits_access() {
    let (service, _) = service();

    for (i, grant) in ["cart:write", "cart:*", "*:*"].into_iter().enumerate() {
        let request = DataAccessRequest::new("t1:cart-1", "cart", DataOperation::Write);
        let outcome = service
            .enforce_data_access(request, user("t1", &format!("u{i}"), &[grant]))
            .await;
        assert!(outcome.allowed, "{grant}: {:?}", outcome.error);
    }

    for (i, grant) in ["order:write", "cart:read", "cart"].into_iter().enumerate() {
        let request = DataAccessRequest::new("t1:cart-1", "cart", DataOperation::Write);
        let outcome = service
            .enforce_data_access(request, user("t1", &format!("x{i}"), &[grant]))
            .await;
        assert!(!outcome.allowed, "{grant} should not grant cart:write");
    }
}

#[tokio::test]
async fn test_required_permissions_are_enforced() {
    let (service, _) = service();

    let outcome = service
        .enforce_data_access(
            DataAccessRequest::new("t1:pay-1", "payment", DataOperation::Read),
            user("t1", "u1", &["payment:write", "payment:read"]),
        )
        .await;
    assert!(outcome.allowed, "{:?}", outcome.error);

    // admin's role grants cover customer but not payment
    let outcome = service
        .enforce_data_access(
            DataAccessRequest::new("t1:pay-1", "payment", DataOperation::Read),
            user("t1", "admin-1", &[]).with_role("admin"),
        )
        .await;
    assert!(!outcome.allowed);

    let outcome = service
        .enforce_data_access(
            DataAccessRequest::new("t1:c-1", "customer", DataOperation::Read),
            user("t1", "admin-1", &[]).with_role("admin"),
        )
        .await;
    assert!(outcome.allowed, "{:?}", outcome.error);

    let outcome = service
        .enforce_data_access(
            DataAccessRequest::new("t1:c-1", "customer", DataOperation::Update),
            user("t1", "admin-1", &[]).with_role("admin"),
        )
        .await;
    assert!(!outcome.allowed);

    let outcome = service
        .enforce_data_access(
            DataAccessRequest::new("t1:c-1", "customer", DataOperation::Read),
            user("t1", "root", &[]).with_role("super_admin"),
        )
        .await;
    assert!(outcome.allowed, "{:?}", outcome.error);
}

#[tokio::test]
async fn test_unknown_resource_type_is_deny_leaning() {
    let (service, _) = service();

    let outcome = service
        .enforce_data_access(
            DataAccessRequest::new("t1:x-1", "ledger", DataOperation::Read),
            user("t1", "u1", &["cart:*"]),
        )
        .await;
    assert!(!outcome.allowed);

    let outcome = service
        .enforce_data_access(
            DataAccessRequest::new("t1:x-1", "ledger", DataOperation::Read)
                .with_payload(json!({"balance": 10})),
            user("t1", "u2", &["ledger:read"]),
        )
        .await;
    assert!(outcome.allowed, "{:?}", outcome.error);
    assert!(outcome.encrypted_data.is_some());
}

#[tokio::test]
async fn test_sensitive_payload_is_encrypted() {
    let (service, _) = service();
    let payload = json!({"card_last4": "4242", "amount": 1999});

    let outcome = service
        .enforce_data_access(
            DataAccessRequest::new("t1:pay-1", "payment", DataOperation::Write)
                .with_payload(payload.clone()),
            user("t1", "u1", &["payment:*"]),
        )
        .await;

    assert!(outcome.allowed, "{:?}", outcome.error);
    let encrypted = outcome.encrypted_data.unwrap();
    assert_eq!(encrypted.algorithm, "AES-256-GCM");

    let decrypted: serde_json::Value = service
        .decrypt_tenant_data("t1", "u1", &encrypted)
        .await
        .unwrap();
    assert_eq!(decrypted, payload);
}

#[tokio::test]
async fn test_payment_payload_encrypted_despite_matrix() {
    let (service, clock) = service();
    let mut boundary = TenantSecurityBoundary::strict_default("t1", clock.now());
    boundary.matrix.resources.insert(
        "payment".to_string(),
        ResourcePolicy {
            classification: DataClassification::Internal,
            required_permissions: Vec::new(),
            isolation_level: IsolationLevel::Strict,
            encryption_required: false,
        },
    );
    service.boundaries().upsert(boundary).await.unwrap();

    let outcome = service
        .enforce_data_access(
            DataAccessRequest::new("t1:pay-1", "payment", DataOperation::Read)
                .with_payload(json!({"amount": 1999})),
            user("t1", "u1", &["payment:read"]),
        )
        .await;

    assert!(outcome.allowed, "{:?}", outcome.error);
    assert!(outcome.encrypted_data.is_some());
}

#[tokio::test]
async fn test_restricted_classification_forces_encryption() {
    let (service, _) = service();

    let plain = service
        .enforce_data_access(
            DataAccessRequest::new("t1:r-1", "report", DataOperation::Read)
                .with_payload(json!({"rows": 3})),
            user("t1", "u1", &["report:read"]),
        )
        .await;
    assert!(plain.allowed);
    assert!(plain.encrypted_data.is_none());

    let classified = service
        .enforce_data_access(
            DataAccessRequest::new("t1:r-1", "report", DataOperation::Read)
                .with_classification(DataClassification::TopSecret)
                .with_payload(json!({"rows": 3})),
            user("t1", "u1", &["report:read"]),
        )
        .await;
    assert!(classified.allowed);
    assert!(classified.encrypted_data.is_some());
    assert_eq!(classified.risk_score, RiskScore::MAX);
}

#[tokio::test]
async fn test_revocation_waits_for_cache_expiry() {
    let (service, clock) = service();
    let request = || DataAccessRequest::new("t1:cart-1", "cart", DataOperation::Write);

    let granted = service
        .enforce_data_access(request(), user("t1", "u1", &["cart:write"]))
        .await;
    assert!(granted.allowed);

    // Within the TTL the cached grant is served even though the permission
    // is gone.
    clock.advance(Duration::seconds(120));
    let stale = service
        .enforce_data_access(request(), user("t1", "u1", &[]))
        .await;
    assert!(stale.allowed);

    clock.advance(Duration::seconds(181));
    let fresh = service
        .enforce_data_access(request(), user("t1", "u1", &[]))
        .await;
    assert!(!fresh.allowed);
}

#[tokio::test]
async fn test_each_decision_writes_one_entry() {
    let (service, _) = service();

    service
        .enforce_data_access(
            DataAccessRequest::new("t1:cart-1", "cart", DataOperation::Read),
            user("t1", "u1", &["cart:read"]),
        )
        .await;
    assert_eq!(service.audit_trail().len(), 1);

    service
        .enforce_data_access(
            DataAccessRequest::new("t1:cart-1", "cart", DataOperation::Delete),
            user("t1", "u1", &["cart:read"]),
        )
        .await;
    assert_eq!(service.audit_trail().len(), 2);

    service
        .validate_cross_tenant_access(
            CrossTenantRequest::new("t1", "t2", "data_read"),
            user("t1", "u1", &[]),
        )
        .await;
    assert_eq!(service.audit_trail().len(), 3);
}

#[tokio::test]
async fn test_cross_tenant_read_granted() {
    let (service, _) = service();

    let outcome = service
        .validate_cross_tenant_access(
            CrossTenantRequest::new("t1", "t2", "data_read").with_justification("support <ticket>"),
            user("t1", "u1", &[]),
        )
        .await;

    assert!(outcome.allowed, "{:?}", outcome.error);
    assert!(!outcome.requires_approval);
    assert!(!outcome.suspicious);
    assert_eq!(outcome.risk_score, RiskScore::new(5));

    let granted = entries_of(&service, AuditEventKind::CrossTenantAccessGranted).await;
    assert_eq!(granted.len(), 1);
    let metadata = granted[0].entry().metadata();
    assert_eq!(metadata["target_tenant"], json!("t2"));
    assert_eq!(metadata["justification"], json!("support &lt;ticket&gt;"));
}

#[tokio::test]
async fn test_cross_tenant_source_must_match_context() {
    let (service, _) = service();

    let outcome = service
        .validate_cross_tenant_access(
            CrossTenantRequest::new("t9", "t2", "data_read"),
            user("t1", "u1", &[]),
        )
        .await;

    assert!(!outcome.allowed);
    assert!(outcome.error.unwrap().contains("does not match source tenant"));
    assert_eq!(
        entries_of(&service, AuditEventKind::CrossTenantAccessAttempted).await.len(),
        1
    );
}

#[tokio::test]
async fn test_unknown_operation_is_denied_across_tenants() {
    let (service, _) = service();

    let outcome = service
        .validate_cross_tenant_access(
            CrossTenantRequest::new("t1", "t2", "wire_funds"),
            user("t1", "root", &[]).with_role("super_admin"),
        )
        .await;

    assert!(!outcome.allowed);
    assert!(outcome.requires_approval);
    assert!(outcome.error.unwrap().contains("not permitted across tenants"));
}

#[tokio::test]
async fn test_cross_tenant_role_hierarchy() {
    let (service, _) = service();

    let denied = service
        .validate_cross_tenant_access(
            CrossTenantRequest::new("t1", "t2", "tenant_support"),
            user("t1", "u1", &[]),
        )
        .await;
    assert!(!denied.allowed);
    assert!(denied.error.unwrap().contains("minimum role admin"));

    let granted = service
        .validate_cross_tenant_access(
            CrossTenantRequest::new("t1", "t2", "tenant_support"),
            user("t1", "a1", &[]).with_role("admin"),
        )
        .await;
    assert!(granted.allowed, "{:?}", granted.error);

    let unknown_role = service
        .validate_cross_tenant_access(
            CrossTenantRequest::new("t1", "t2", "tenant_support"),
            user("t1", "a2", &[]).with_role("owner"),
        )
        .await;
    assert!(!unknown_role.allowed);
}

#[tokio::test]
async fn test_cross_tenant_approval_requirement() {
    let (service, _) = service();

    let export = service
        .validate_cross_tenant_access(
            CrossTenantRequest::new("t1", "t2", "data_export"),
            user("t1", "a1", &[]).with_role("admin"),
        )
        .await;
    assert!(export.allowed, "{:?}", export.error);
    assert!(export.requires_approval);
    assert_eq!(export.risk_score, RiskScore::new(8));

    let read = service
        .validate_cross_tenant_access(
            CrossTenantRequest::new("t1", "t3", "data_read").with_approval(),
            user("t1", "u1", &[]),
        )
        .await;
    assert!(read.allowed);
    assert!(read.requires_approval);
}

#[tokio::test]
async fn test_cross_tenant_boundary_restrictions() {
    let (service, clock) = service();
    let mut boundary = TenantSecurityBoundary::strict_default("t1", clock.now());
    boundary.allowed_tenants = vec!["t2".to_string()];
    boundary.restricted_operations = vec!["data_export".to_string()];
    service.boundaries().upsert(boundary).await.unwrap();

    let allowed = service
        .validate_cross_tenant_access(
            CrossTenantRequest::new("t1", "t2", "data_read"),
            user("t1", "u1", &[]),
        )
        .await;
    assert!(allowed.allowed);

    let other_target = service
        .validate_cross_tenant_access(
            CrossTenantRequest::new("t1", "t3", "data_read"),
            user("t1", "u2", &[]),
        )
        .await;
    assert!(!other_target.allowed);
    assert!(other_target.error.unwrap().contains("not an allowed target"));

    let restricted = service
        .validate_cross_tenant_access(
            CrossTenantRequest::new("t1", "t2", "data_export"),
            user("t1", "a1", &[]).with_role("admin"),
        )
        .await;
    assert!(!restricted.allowed);
    assert!(restricted.error.unwrap().contains("restricted"));
}

#[tokio::test]
async fn test_rapid_tenant_switching_is_suspicious() {
    let (service, clock) = service();
    let mut outcomes = Vec::new();

    for target in ["t2", "t3", "t4", "t5"] {
        let outcome = service
            .validate_cross_tenant_access(
                CrossTenantRequest::new("t1", target, "data_read"),
                user("t1", "u1", &[]),
            )
            .await;
        outcomes.push(outcome);
        clock.advance(Duration::minutes(2));
    }

    assert!(outcomes[..3].iter().all(|o| o.allowed && !o.suspicious));
    let flagged = &outcomes[3];
    assert!(!flagged.allowed);
    assert!(flagged.suspicious);
    assert!(flagged.risk_score >= RiskScore::new(9));
    assert!(flagged.error.as_deref().unwrap().contains("Suspicious activity"));

    let detected = entries_of(&service, AuditEventKind::SuspiciousActivityDetected).await;
    assert_eq!(detected.len(), 1);

    // State keeps compounding: a further call stays flagged.
    let again = service
        .validate_cross_tenant_access(
            CrossTenantRequest::new("t1", "t2", "data_read"),
            user("t1", "u1", &[]),
        )
        .await;
    assert!(again.suspicious);
    assert!(!again.allowed);

    let state = service.activity().snapshot("u1").await.unwrap().unwrap();
    assert_eq!(state.history().count(), 5);
}

#[tokio::test]
async fn test_spaced_switching_is_not_suspicious() {
    let (service, clock) = service();

    for target in ["t2", "t3", "t4", "t5"] {
        let outcome = service
            .validate_cross_tenant_access(
                CrossTenantRequest::new("t1", target, "data_read"),
                user("t1", "u1", &[]),
            )
            .await;
        assert!(outcome.allowed, "{target}: {:?}", outcome.error);
        clock.advance(Duration::minutes(6));
    }
}

#[tokio::test]
async fn test_encrypt_then_decrypt_under_other_tenant_fails() {
    let (service, _) = service();
    let payload = service
        .encrypt_tenant_data("T1", "u1", &json!({"a": 1}))
        .await
        .unwrap();

    let same: serde_json::Value = service.decrypt_tenant_data("T1", "u1", &payload).await.unwrap();
    assert_eq!(same, json!({"a": 1}));

    let err = service
        .decrypt_tenant_data::<serde_json::Value>("T2", "u1", &payload)
        .await
        .unwrap_err();
    assert!(err.is_crypto_error());

    let failures = entries_of(&service, AuditEventKind::EncryptionFailed).await;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].entry().tenant_id(), "T2");
    assert_eq!(
        entries_of(&service, AuditEventKind::DataEncrypted).await.len(),
        1
    );
    assert_eq!(
        entries_of(&service, AuditEventKind::DataDecrypted).await.len(),
        1
    );
}

#[tokio::test]
async fn test_tampered_tag_fails_closed() {
    let (service, _) = service();
    let mut payload = service
        .encrypt_tenant_data("t1", "u1", &json!({"a": 1}))
        .await
        .unwrap();
    let other = service
        .encrypt_tenant_data("t1", "u1", &json!({"a": 2}))
        .await
        .unwrap();
    payload.auth_tag = other.auth_tag;

    let result = service
        .decrypt_tenant_data::<serde_json::Value>("t1", "u1", &payload)
        .await;
    assert!(matches!(result, Err(SecurityError::Decryption { .. })));
}

#[tokio::test]
async fn test_crypto_rejects_malformed_identity() {
    let (service, _) = service();
    let err = service
        .encrypt_tenant_data("", "u1", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, SecurityError::InvalidContext { .. }));
}

#[tokio::test]
async fn test_key_rotation() {
    let (service, clock) = service();
    let old = service
        .encrypt_tenant_data("t1", "u1", &json!({"v": "old"}))
        .await
        .unwrap();
    assert!(!service.key_rotation_due("t1").await.unwrap());

    clock.advance(Duration::days(91));
    assert!(service.key_rotation_due("t1").await.unwrap());

    service
        .rotate_encryption_key("k2", KeyMaterial::generate().unwrap())
        .unwrap();
    assert!(!service.key_rotation_due("t1").await.unwrap());

    let new = service
        .encrypt_tenant_data("t1", "u1", &json!({"v": "new"}))
        .await
        .unwrap();
    assert_eq!(new.key_id, "k2");

    let decrypted: serde_json::Value = service.decrypt_tenant_data("t1", "u1", &old).await.unwrap();
    assert_eq!(decrypted, json!({"v": "old"}));
}

#[tokio::test]
async fn test_token_lifecycle() {
    let (service, clock) = service();
    let token = service
        .generate_security_token("t1", "u1", vec!["cart:read".to_string()])
        .await
        .unwrap();
    assert_eq!(
        entries_of(&service, AuditEventKind::SecurityTokenIssued).await.len(),
        1
    );

    let verified = service.verify_security_token(&token).await;
    assert!(verified.valid);
    let claims = verified.claims.unwrap();
    assert_eq!(claims.tenant_id, "t1");
    assert_eq!(claims.permissions, vec!["cart:read".to_string()]);

    clock.advance(Duration::seconds(3601));
    let expired = service.verify_security_token(&token).await;
    assert!(!expired.valid);
    assert!(expired.claims.is_none());
    assert!(expired.error.unwrap().contains("expired"));
}

#[tokio::test]
async fn test_token_rejections_are_audited() {
    let (service, _) = service();
    let token = service
        .generate_security_token("t1", "u1", Vec::new())
        .await
        .unwrap();
    let (payload, _) = token.split_once('.').unwrap();

    let forged = format!("{payload}.{}", "A".repeat(43));
    let mismatch = service.verify_security_token(&forged).await;
    assert!(!mismatch.valid);
    assert!(mismatch.error.unwrap().contains("signature"));

    let malformed = service.verify_security_token("not-a-token").await;
    assert!(!malformed.valid);
    assert!(malformed.error.unwrap().contains("Malformed"));

    let rejected = entries_of(&service, AuditEventKind::SecurityTokenRejected).await;
    assert_eq!(rejected.len(), 2);
    assert!(rejected.iter().all(|e| !e.entry().success()));
}

#[tokio::test]
async fn test_security_summary() {
    let (service, _) = service();

    service
        .enforce_data_access(
            DataAccessRequest::new("t1:cart-1", "cart", DataOperation::Read),
            user("t1", "u1", &["cart:read"]),
        )
        .await;
    service
        .enforce_data_access(
            DataAccessRequest::new("t1:cart-1", "cart", DataOperation::Export),
            user("t1", "u1", &["cart:read"]),
        )
        .await;
    service
        .enforce_data_access(
            DataAccessRequest::new("t2:cart-1", "cart", DataOperation::Read),
            user("t1", "u1", &["cart:read"]),
        )
        .await;
    service
        .enforce_data_access(
            DataAccessRequest::new("t2:cart-1", "cart", DataOperation::Read),
            user("t2", "u2", &["cart:read"]),
        )
        .await;

    let summary = service.security_summary("t1").await.unwrap();
    assert_eq!(summary.total_entries, 3);
    assert_eq!(summary.granted, 1);
    assert_eq!(summary.denied, 2);
    assert_eq!(summary.isolation_violations, 1);
    assert_eq!(summary.critical_alerts, 0);
    assert!(summary.average_risk > 0.0 && summary.average_risk <= 10.0);

    let empty = service.security_summary("nobody").await.unwrap();
    assert_eq!(empty.total_entries, 0);
    assert!(empty.average_risk.abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_sealed_trail_verifies() {
    let mut config = config();
    config.audit.sealing_key = Some(SecretString::new("audit-sealing-key-0123456789abcdef"));
    let (service, _) = service_with(config);
    assert!(service.audit_trail().is_sealed());

    for op in [DataOperation::Read, DataOperation::Write, DataOperation::Read] {
        service
            .enforce_data_access(
                DataAccessRequest::new("t1:cart-1", "cart", op),
                user("t1", "u1", &["cart:read"]),
            )
            .await;
    }

    let entries = service
        .audit_trail()
        .query(&AuditFilter::new())
        .await
        .unwrap();
    assert_eq!(entries.len(), 3);
    service.audit_trail().verify_chain(&entries).unwrap();
}

#[tokio::test]
async fn test_build_rejects_invalid_config() {
    let short = SecurityConfig::with_secrets("short", MASTER_KEY);
    let err = TenantSecurityService::builder(short).build().unwrap_err();
    assert!(matches!(err, SecurityError::Configuration { .. }));

    let bad_key = SecurityConfig::with_secrets(TOKEN_SECRET, "zz");
    assert!(TenantSecurityService::builder(bad_key).build().is_err());
}

#[tokio::test]
async fn test_boundary_created_lazily() {
    let (service, _) = service();
    assert!(service.boundaries().tenants().await.unwrap().is_empty());

    service
        .enforce_data_access(
            DataAccessRequest::new("t1:cart-1", "cart", DataOperation::Read),
            user("t1", "u1", &["cart:read"]),
        )
        .await;

    let boundary = service.boundaries().get("t1").await.unwrap().unwrap();
    assert_eq!(boundary.default_isolation, IsolationLevel::Strict);
    assert_eq!(boundary.default_classification, DataClassification::Internal);
}
