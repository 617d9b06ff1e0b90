use std::sync::Arc;

use chrono::Utc;

use crate::gate::{AccessGate, LoginPosture};
use crate::models::{NewUser, User};
use crate::services::error::{AuthError, AuthResult};
use crate::services::{MessageSender, SessionClaims, SessionEnvelope, TokenService};
use crate::store::CredentialStore;
use crate::utils::cookie::{self, SessionCookie};
use crate::utils::{
    hash_secret, normalize_email, normalize_username, valid_email, verify_secret, Secret,
    SecretHash,
};
use crate::webauthn::types::{
    AuthenticationOptions, AuthenticationResponse, RegistrationOptions, RegistrationResponse,
};
use crate::webauthn::WebAuthnService;

const RESET_SUBJECT: &str = "Password Reset";

/// Which ceremony a login attempt should continue with.
#[derive(Debug)]
pub enum StartOutcome {
    /// Unknown username: an account shell was created, enroll its first device.
    RegisterUser(RegistrationOptions),
    /// Known account that has no device yet, or asked to add another one.
    RegisterDevice(RegistrationOptions),
    /// Known account with at least one device: authenticate.
    Login(AuthenticationOptions),
}

/// Payload completing a full account registration.
#[derive(Debug)]
pub struct RegistrationRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub device_name: String,
    pub response: RegistrationResponse,
}

/// Everything the calling layer needs after an authentication step succeeds:
/// the signed token, its claims, the sealed cookie to set, and which step the
/// user must complete next.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub claims: SessionClaims,
    pub cookie: SessionCookie,
    pub posture: LoginPosture,
}

/// Ties ceremonies, passwords, tokens, and delivery into the login and
/// recovery flows.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    webauthn: Arc<WebAuthnService>,
    tokens: Arc<TokenService>,
    mailer: Arc<dyn MessageSender>,
    gate: AccessGate,
    public_url: String,
    cookie_secret: String,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        webauthn: Arc<WebAuthnService>,
        tokens: Arc<TokenService>,
        mailer: Arc<dyn MessageSender>,
        gate: AccessGate,
        public_url: String,
        cookie_secret: String,
    ) -> Self {
        Self {
            store,
            webauthn,
            tokens,
            mailer,
            gate,
            public_url,
            cookie_secret,
        }
    }

    /// Entry point for every login attempt.
    ///
    /// Unknown usernames get an account shell and first-device enrollment;
    /// known accounts continue with device registration or authentication
    /// depending on their device count and the `register_device` request.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self, username: &str, register_device: bool) -> AuthResult<StartOutcome> {
        let username = normalize_username(username);

        let Some(user) = self.store.find_user_by_username(&username).await? else {
            let user = self.store.create_user(NewUser::placeholder(username)).await?;
            tracing::info!(user_id = user.id, "Created account shell for new username");
            let options = self.webauthn.begin_registration(user.id).await?;
            return Ok(StartOutcome::RegisterUser(options));
        };

        let device_count = self.store.device_count(user.id).await?;

        if device_count == 0 || register_device {
            let options = self.webauthn.begin_registration(user.id).await?;
            return Ok(StartOutcome::RegisterDevice(options));
        }

        let options = self.webauthn.begin_authentication(user.id).await?;
        Ok(StartOutcome::Login(options))
    }

    /// Attach an authenticator to an existing account.
    ///
    /// An account that has a password must present it before another
    /// authenticator can be attached.
    pub async fn finish_device_registration(
        &self,
        username: &str,
        device_name: &str,
        password: Option<&str>,
        response: &RegistrationResponse,
    ) -> AuthResult<User> {
        let username = normalize_username(username);
        let Some(user) = self.store.find_user_by_username(&username).await? else {
            return Err(AuthError::UserNotFound);
        };

        if let Some(hash) = user.password_hash.as_deref() {
            let Some(password) = password else {
                tracing::warn!(user_id = user.id, "Device registration without required password");
                return Err(AuthError::InvalidCredentials);
            };
            let stored = SecretHash::new(hash.to_string());
            if verify_secret(&Secret::new(password.to_string()), &stored).is_err() {
                tracing::warn!(user_id = user.id, "Device registration with incorrect password");
                return Err(AuthError::InvalidCredentials);
            }
        }

        let (user, verified) = self
            .webauthn
            .finish_registration(user.id, device_name, response)
            .await?;

        if !verified {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Complete a new account's registration: enroll the device, then store
    /// the chosen password and email.
    pub async fn finish_registration(&self, request: RegistrationRequest) -> AuthResult<User> {
        let email = normalize_email(&request.email);
        if !valid_email(&email) {
            return Err(AuthError::Validation("Invalid email format".to_string()));
        }
        if let Some(owner) = self.store.find_user_by_email(&email).await? {
            if owner.username != normalize_username(&request.username) {
                tracing::warn!(user_id = owner.id, "Registration with an email already in use");
                return Err(AuthError::Validation("Email already in use".to_string()));
            }
        }

        // Fresh account shells carry no password, so the password check inside
        // the device step does not apply to them yet.
        let mut user = self
            .finish_device_registration(
                &request.username,
                &request.device_name,
                Some(&request.password),
                &request.response,
            )
            .await?;

        let hash = hash_secret(&Secret::new(request.password.clone()))?;
        user.password_hash = Some(hash.into_string());
        user.need_password_reset = false;
        user.email = email;
        user.email_confirmed = false;
        self.store.update_user(&user).await?;

        tracing::info!(user_id = user.id, "Completed account registration");
        Ok(user)
    }

    /// Complete an authentication ceremony for a known username.
    pub async fn finish_login(
        &self,
        username: &str,
        response: &AuthenticationResponse,
    ) -> AuthResult<User> {
        let username = normalize_username(username);
        let Some(user) = self.store.find_user_by_username(&username).await? else {
            tracing::warn!("Login attempt for unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        let (user, verified) = self.webauthn.finish_authentication(user.id, response).await?;

        if !verified {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Check an email/password pair.
    ///
    /// Unknown email, missing password, and wrong password all collapse into
    /// `InvalidCredentials` toward the caller; the distinction only reaches
    /// the logs.
    pub async fn verify_password(&self, email: &str, password: &str) -> AuthResult<User> {
        let email = normalize_email(email);
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            tracing::info!("Password check for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let Some(hash) = user.password_hash.as_deref() else {
            tracing::info!(user_id = user.id, "Password check for account without a password");
            return Err(AuthError::InvalidCredentials);
        };

        let stored = SecretHash::new(hash.to_string());
        if verify_secret(&Secret::new(password.to_string()), &stored).is_err() {
            tracing::info!(user_id = user.id, "Incorrect password");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Store a new password and clear the reset requirement.
    pub async fn set_password(&self, user: &User, password: &str) -> AuthResult<User> {
        self.store_password(user, password, false).await
    }

    /// Store an administratively assigned password the user must replace at
    /// next login.
    pub async fn set_temp_password(&self, user: &User, password: &str) -> AuthResult<User> {
        self.store_password(user, password, true).await
    }

    /// Replace the password after checking the current one.
    pub async fn update_password(
        &self,
        email: &str,
        current_password: &str,
        new_password: &str,
    ) -> AuthResult<User> {
        let user = self.verify_password(email, current_password).await?;
        self.set_password(&user, new_password).await
    }

    /// Email a reset link for the address, if an account exists for it.
    ///
    /// Unknown addresses are not disclosed to the caller: the request
    /// succeeds silently either way.
    pub async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        let email = normalize_email(email);
        if self.store.find_user_by_email(&email).await?.is_none() {
            tracing::info!("Password reset requested for unknown email");
            return Ok(());
        }

        let token = self.tokens.mint_reset_token(&email)?;
        let link = format!(
            "{}/login/reset-password?rpt={}",
            self.public_url.trim_end_matches('/'),
            urlencoding::encode(&token)
        );
        let minutes = self.tokens.expiry_seconds() / 60;
        let body = format!(
            "Please click the following link to reset your password: {}. This link will expire in {} minutes.",
            link, minutes
        );

        self.mailer
            .send(&email, RESET_SUBJECT, &body)
            .await
            .map_err(|e| AuthError::Delivery(e.to_string()))?;

        tracing::info!("Password reset email sent");
        Ok(())
    }

    /// Redeem a reset token and store the new password.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AuthResult<User> {
        let email = self.tokens.verify_reset_token(token)?;

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            return Err(AuthError::UserNotFound);
        };

        self.set_password(&user, new_password).await
    }

    /// Mint a session for an authenticated user, seal it into a cookie, and
    /// classify what the user still has to do. Stamps the login time.
    pub async fn issue_session(
        &self,
        user: &User,
        client_identifier: &str,
        mfa_method: Option<&str>,
    ) -> AuthResult<IssuedSession> {
        let device_count = self.store.device_count(user.id).await?;
        let (token, claims) = self
            .tokens
            .mint(user, device_count, client_identifier, mfa_method)?;

        let envelope = SessionEnvelope::new(token.clone());
        let sealed = cookie::seal(&envelope, &self.cookie_secret, self.tokens.expiry_seconds())?;
        let posture = self.gate.login_posture(&claims);

        // Stamp a fresh copy of the record; the caller's snapshot may lag
        // behind other updates and must not overwrite them.
        let mut stamped = self
            .store
            .find_user_by_id(user.id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        stamped.last_login = Some(Utc::now());
        self.store.update_user(&stamped).await?;

        tracing::info!(
            user_id = user.id,
            client_identifier = %client_identifier,
            posture = posture.code(),
            "Session issued"
        );

        Ok(IssuedSession {
            token,
            claims,
            cookie: sealed,
            posture,
        })
    }

    /// Recover verified claims from a raw session cookie value.
    pub fn read_session(&self, raw_cookie: &str) -> AuthResult<SessionClaims> {
        let envelope = cookie::open(raw_cookie, &self.cookie_secret)?;
        self.tokens.verify(&envelope.token)
    }

    /// Whether this client identifier has been seen for the user before.
    pub async fn is_known_client(&self, user_id: i64, client_identifier: &str) -> AuthResult<bool> {
        Ok(self.store.client_known(user_id, client_identifier).await?)
    }

    /// Remember a client identifier for the user.
    pub async fn register_client(&self, user_id: i64, client_identifier: &str) -> AuthResult<()> {
        self.store.register_client(user_id, client_identifier).await?;
        Ok(())
    }

    async fn store_password(
        &self,
        user: &User,
        password: &str,
        needs_reset: bool,
    ) -> AuthResult<User> {
        let hash = hash_secret(&Secret::new(password.to_string()))?;

        let mut updated = user.clone();
        updated.password_hash = Some(hash.into_string());
        updated.need_password_reset = needs_reset;
        self.store.update_user(&updated).await?;

        Ok(updated)
    }
}
