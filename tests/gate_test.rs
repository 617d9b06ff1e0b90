//! Access gate decision table: posture conditions crossed with per-operation
//! tolerance flags.

mod common;

use auth_core::{
    AccessGate, AuthError, Decision, DenyReason, GateConfig, SessionClaims, UserRole,
};
use common::{confirm_email, login, register_account, spawn_harness};

fn claims(
    need_password_reset: bool,
    email_confirmed: bool,
    mfa_enabled: bool,
    mfa_method: Option<&str>,
) -> SessionClaims {
    SessionClaims {
        sub: 1,
        role: UserRole::User,
        email: "alice@example.com".to_string(),
        username: "alice".to_string(),
        email_confirmed,
        need_password_reset,
        mfa_enabled,
        mfa_method: mfa_method.map(str::to_string),
        client_identifier: "client-1".to_string(),
        token_type: "auth".to_string(),
        iat: 0,
        exp: i64::MAX,
    }
}

#[test]
fn test_missing_claims_denied_under_every_config() {
    let gate = AccessGate::new(true);
    for config in [
        GateConfig::STRICT,
        GateConfig::RECOVERY,
        GateConfig::MFA_CEREMONY,
    ] {
        assert_eq!(
            gate.decide(None, config),
            Decision::Deny(DenyReason::Unauthenticated)
        );
    }
}

#[test]
fn test_strict_decision_table() {
    let gate = AccessGate::new(true);
    let cases = [
        (claims(false, true, true, Some("webauthn")), Decision::Allow),
        (
            claims(true, true, true, Some("webauthn")),
            Decision::Deny(DenyReason::PasswordResetRequired),
        ),
        (
            claims(false, false, true, Some("webauthn")),
            Decision::Deny(DenyReason::EmailVerificationRequired),
        ),
        (
            claims(false, true, false, None),
            Decision::Deny(DenyReason::MfaRequired),
        ),
        // A second factor exists but this session was not minted off one.
        (
            claims(false, true, true, None),
            Decision::Deny(DenyReason::MfaRequired),
        ),
        (
            claims(false, true, false, Some("webauthn")),
            Decision::Deny(DenyReason::MfaRequired),
        ),
    ];

    for (claims, expected) in cases {
        assert_eq!(gate.decide(Some(&claims), GateConfig::STRICT), expected);
    }
}

#[test]
fn test_decision_table_full_cross() {
    let gate = AccessGate::new(true);

    // Every claims state against every flag combination; the first unmet
    // check names the denial.
    for need_password_reset in [false, true] {
        for email_confirmed in [false, true] {
            for mfa_enabled in [false, true] {
                for mfa_method in [None, Some("webauthn")] {
                    for flags in 0..8u8 {
                        let config = GateConfig {
                            allow_expired_password: flags & 1 != 0,
                            allow_unverified_email: flags & 2 != 0,
                            allow_no_mfa: flags & 4 != 0,
                        };

                        let expected = if need_password_reset && !config.allow_expired_password {
                            Decision::Deny(DenyReason::PasswordResetRequired)
                        } else if !email_confirmed && !config.allow_unverified_email {
                            Decision::Deny(DenyReason::EmailVerificationRequired)
                        } else if (!mfa_enabled || mfa_method.is_none()) && !config.allow_no_mfa {
                            Decision::Deny(DenyReason::MfaRequired)
                        } else {
                            Decision::Allow
                        };

                        let state = claims(need_password_reset, email_confirmed, mfa_enabled, mfa_method);
                        assert_eq!(
                            gate.decide(Some(&state), config),
                            expected,
                            "state ({}, {}, {}, {:?}) under {:?}",
                            need_password_reset,
                            email_confirmed,
                            mfa_enabled,
                            mfa_method,
                            config
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn test_first_unmet_condition_wins() {
    let gate = AccessGate::new(true);

    let everything_unmet = claims(true, false, false, None);
    assert_eq!(
        gate.decide(Some(&everything_unmet), GateConfig::STRICT),
        Decision::Deny(DenyReason::PasswordResetRequired)
    );

    let email_and_mfa_unmet = claims(false, false, false, None);
    assert_eq!(
        gate.decide(Some(&email_and_mfa_unmet), GateConfig::STRICT),
        Decision::Deny(DenyReason::EmailVerificationRequired)
    );

    let mfa_unmet = claims(false, true, false, None);
    assert_eq!(
        gate.decide(Some(&mfa_unmet), GateConfig::STRICT),
        Decision::Deny(DenyReason::MfaRequired)
    );
}

#[test]
fn test_tolerance_flags_waive_single_conditions() {
    let gate = AccessGate::new(true);

    let expired_password = claims(true, true, true, Some("webauthn"));
    let relaxed = GateConfig {
        allow_expired_password: true,
        ..GateConfig::STRICT
    };
    assert_eq!(gate.decide(Some(&expired_password), relaxed), Decision::Allow);

    let unverified = claims(false, false, true, Some("webauthn"));
    let relaxed = GateConfig {
        allow_unverified_email: true,
        ..GateConfig::STRICT
    };
    assert_eq!(gate.decide(Some(&unverified), relaxed), Decision::Allow);

    let no_mfa = claims(false, true, false, None);
    assert_eq!(
        gate.decide(Some(&no_mfa), GateConfig::MFA_CEREMONY),
        Decision::Allow
    );

    // A waived condition does not waive the others.
    let unverified_no_mfa = claims(false, false, false, None);
    assert_eq!(
        gate.decide(Some(&unverified_no_mfa), GateConfig::MFA_CEREMONY),
        Decision::Deny(DenyReason::EmailVerificationRequired)
    );
}

#[test]
fn test_recovery_config_waives_everything_but_authentication() {
    let gate = AccessGate::new(true);
    assert_eq!(
        gate.decide(Some(&claims(true, false, false, None)), GateConfig::RECOVERY),
        Decision::Allow
    );
}

#[test]
fn test_gate_with_mfa_not_required() {
    let gate = AccessGate::new(false);
    assert_eq!(
        gate.decide(Some(&claims(false, true, false, None)), GateConfig::STRICT),
        Decision::Allow
    );
    // The other posture conditions still apply.
    assert_eq!(
        gate.decide(Some(&claims(false, false, false, None)), GateConfig::STRICT),
        Decision::Deny(DenyReason::EmailVerificationRequired)
    );
}

#[test]
fn test_require_maps_denials_to_errors() {
    assert!(Decision::Allow.require().is_ok());

    let result = Decision::Deny(DenyReason::MfaRequired).require();
    assert!(matches!(
        result,
        Err(AuthError::Denied(DenyReason::MfaRequired))
    ));
}

#[test]
fn test_deny_reason_codes() {
    assert_eq!(DenyReason::Unauthenticated.as_str(), "unauthenticated");
    assert_eq!(
        DenyReason::PasswordResetRequired.as_str(),
        "password_reset_required"
    );
    assert_eq!(
        DenyReason::EmailVerificationRequired.as_str(),
        "email_verification_required"
    );
    assert_eq!(DenyReason::MfaRequired.as_str(), "mfa_required");
}

#[tokio::test]
async fn test_minted_claims_through_the_gate() {
    let harness = spawn_harness();
    register_account(&harness, "alice", "alice@example.com", "pw one two three").await;
    let user = login(&harness, "alice", 1).await;
    let gate = AccessGate::new(true);

    let session = harness
        .auth
        .issue_session(&user, "client-1", Some("webauthn"))
        .await
        .unwrap();
    assert_eq!(
        gate.decide(Some(&session.claims), GateConfig::STRICT),
        Decision::Deny(DenyReason::EmailVerificationRequired)
    );
    assert_eq!(
        gate.decide(Some(&session.claims), GateConfig::RECOVERY),
        Decision::Allow
    );

    let user = confirm_email(&harness, user.id).await;
    let session = harness
        .auth
        .issue_session(&user, "client-1", Some("webauthn"))
        .await
        .unwrap();
    assert_eq!(
        gate.decide(Some(&session.claims), GateConfig::STRICT),
        Decision::Allow
    );

    let session = harness
        .auth
        .issue_session(&user, "client-1", None)
        .await
        .unwrap();
    assert_eq!(
        gate.decide(Some(&session.claims), GateConfig::STRICT),
        Decision::Deny(DenyReason::MfaRequired)
    );
    assert_eq!(
        gate.decide(Some(&session.claims), GateConfig::MFA_CEREMONY),
        Decision::Allow
    );
}
