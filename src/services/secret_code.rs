use std::sync::Arc;

use chrono::Utc;
use rand::Rng;

use crate::models::{PendingCode, User};
use crate::services::error::{AuthError, AuthResult};
use crate::services::MessageSender;
use crate::store::CredentialStore;
use crate::utils::{hash_secret, verify_secret, Secret, SecretHash};

const VERIFICATION_SUBJECT: &str = "Email Verification";

/// Issues and validates the short-lived codes used to confirm an email
/// address. Only the Argon2 hash of a code is ever stored; the plaintext
/// goes to the mailer and nowhere else.
pub struct SecretCodeService {
    store: Arc<dyn CredentialStore>,
    mailer: Arc<dyn MessageSender>,
    expiry_seconds: i64,
}

impl SecretCodeService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        mailer: Arc<dyn MessageSender>,
        expiry_seconds: i64,
    ) -> Self {
        Self {
            store,
            mailer,
            expiry_seconds,
        }
    }

    /// Issue a code to the user's email address.
    ///
    /// A still-valid earlier code is left in place unless `force` is set.
    /// When delivery fails the stored code is rolled back, so a later attempt
    /// starts clean instead of referencing a code nobody received.
    #[tracing::instrument(skip(self), fields(user_id = user_id))]
    pub async fn issue(&self, user_id: i64, force: bool) -> AuthResult<()> {
        let mut user = self.load_user(user_id).await?;

        let reissue = force
            || user
                .pending_code
                .as_ref()
                .map_or(true, |code| code.is_expired(self.expiry_seconds));

        if !reissue {
            tracing::debug!("Existing code still valid, not reissuing");
            return Ok(());
        }

        let code = generate_code();
        let hash = hash_secret(&Secret::new(code.clone()))?;

        user.pending_code = Some(PendingCode {
            hash: hash.into_string(),
            issued_at: Utc::now(),
        });
        self.store.update_user(&user).await?;

        let body = format!(
            "Please copy the following code to verify your email: {}",
            code
        );
        if let Err(e) = self.mailer.send(&user.email, VERIFICATION_SUBJECT, &body).await {
            user.pending_code = None;
            self.store.update_user(&user).await?;
            tracing::warn!(error = %e, "Code delivery failed, rolled back stored code");
            return Err(AuthError::Delivery(e.to_string()));
        }

        tracing::info!("Verification code issued");
        Ok(())
    }

    /// Check a submitted code and, on success, mark the email confirmed.
    ///
    /// The stored code is cleared on success; a wrong or expired submission
    /// leaves it in place so the user can retry until the window closes.
    pub async fn validate(&self, user_id: i64, submitted: &str) -> AuthResult<User> {
        let mut user = self.load_user(user_id).await?;

        let Some(pending) = user.pending_code.clone() else {
            return Err(AuthError::NoCodePresent);
        };

        if pending.is_expired(self.expiry_seconds) {
            return Err(AuthError::CodeExpired);
        }

        let stored = SecretHash::new(pending.hash.clone());
        if verify_secret(&Secret::new(submitted.to_string()), &stored).is_err() {
            return Err(AuthError::CodeIncorrect);
        }

        user.pending_code = None;
        user.email_confirmed = true;
        self.store.update_user(&user).await?;

        tracing::info!(user_id, "Email confirmed");
        Ok(user)
    }

    async fn load_user(&self, user_id: i64) -> AuthResult<User> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

/// 6-digit zero-padded numeric code.
fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_zero_padded_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
