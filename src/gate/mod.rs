//! Pure authorization decisions derived from verified session claims.
//!
//! Every protected operation declares which posture conditions it tolerates
//! through a [`GateConfig`]; the gate folds those flags together with the
//! process-wide MFA switch into one allow/deny decision. No state is read
//! from anywhere else, so decisions are fully testable in isolation.

use std::fmt;

use crate::services::error::AuthError;
use crate::services::SessionClaims;

/// Per-operation tolerance for unmet posture conditions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateConfig {
    /// Let users with an expired password through, so they can set a new one.
    pub allow_expired_password: bool,
    /// Let users with an unconfirmed email through, so they can confirm it.
    pub allow_unverified_email: bool,
    /// Skip the MFA check even when the process-wide switch requires it.
    pub allow_no_mfa: bool,
}

impl GateConfig {
    /// Every posture condition enforced.
    pub const STRICT: GateConfig = GateConfig {
        allow_expired_password: false,
        allow_unverified_email: false,
        allow_no_mfa: false,
    };

    /// Recovery operations stay reachable while posture conditions are unmet.
    pub const RECOVERY: GateConfig = GateConfig {
        allow_expired_password: true,
        allow_unverified_email: true,
        allow_no_mfa: true,
    };

    /// Authenticator ceremonies run before MFA can possibly be satisfied.
    pub const MFA_CEREMONY: GateConfig = GateConfig {
        allow_expired_password: false,
        allow_unverified_email: false,
        allow_no_mfa: true,
    };
}

/// The first unmet condition, reported as a stable code for the caller to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    PasswordResetRequired,
    EmailVerificationRequired,
    MfaRequired,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "unauthenticated",
            DenyReason::PasswordResetRequired => "password_reset_required",
            DenyReason::EmailVerificationRequired => "email_verification_required",
            DenyReason::MfaRequired => "mfa_required",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Convert a denial into an error for callers that cannot proceed without access.
    pub fn require(self) -> Result<(), AuthError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(AuthError::Denied(reason)),
        }
    }
}

/// What a freshly logged-in user still has to do before their session is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPosture {
    PasswordReset,
    VerifyEmail,
    MfaRegistrationRequired,
    MfaLoginRequired,
    Complete,
}

impl LoginPosture {
    /// Stable code handed to the calling layer to drive next-step UI.
    pub fn code(&self) -> &'static str {
        match self {
            LoginPosture::PasswordReset => "password_reset",
            LoginPosture::VerifyEmail => "verify_email",
            LoginPosture::MfaRegistrationRequired => "mfa_registration_required",
            LoginPosture::MfaLoginRequired => "mfa_login_required",
            LoginPosture::Complete => "",
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, LoginPosture::Complete)
    }
}

/// Evaluates posture conditions in a fixed order; the first unmet one wins.
#[derive(Debug, Clone, Copy)]
pub struct AccessGate {
    mfa_required: bool,
}

impl AccessGate {
    pub fn new(mfa_required: bool) -> Self {
        Self { mfa_required }
    }

    /// Decide whether a request may proceed. `None` claims means no valid token
    /// was presented at all.
    pub fn decide(&self, claims: Option<&SessionClaims>, config: GateConfig) -> Decision {
        let Some(claims) = claims else {
            return Decision::Deny(DenyReason::Unauthenticated);
        };

        if !config.allow_expired_password && claims.need_password_reset {
            return Decision::Deny(DenyReason::PasswordResetRequired);
        }

        if !config.allow_unverified_email && !claims.email_confirmed {
            return Decision::Deny(DenyReason::EmailVerificationRequired);
        }

        if self.mfa_required
            && !config.allow_no_mfa
            && (!claims.mfa_enabled || claims.mfa_method.is_none())
        {
            return Decision::Deny(DenyReason::MfaRequired);
        }

        Decision::Allow
    }

    /// Classify a just-minted session: which step, if any, the user must finish
    /// next. Checks run in the same order as [`AccessGate::decide`].
    pub fn login_posture(&self, claims: &SessionClaims) -> LoginPosture {
        if claims.need_password_reset {
            return LoginPosture::PasswordReset;
        }

        if !claims.email_confirmed {
            return LoginPosture::VerifyEmail;
        }

        if self.mfa_required && !claims.mfa_enabled {
            return LoginPosture::MfaRegistrationRequired;
        }

        if self.mfa_required && claims.mfa_method.is_none() {
            return LoginPosture::MfaLoginRequired;
        }

        LoginPosture::Complete
    }
}
