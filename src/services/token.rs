use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::{User, UserRole};
use crate::services::error::{AuthError, AuthResult};

/// `type` claim on session tokens.
pub const TOKEN_TYPE_AUTH: &str = "auth";
/// `type` claim on password-reset tokens.
pub const TOKEN_TYPE_RESET: &str = "reset_password";

/// Claims embedded in a session token.
///
/// Besides identity, the token carries the security posture the session was
/// minted under, so the gate can re-derive it on every request without a
/// storage round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: i64,
    pub role: UserRole,
    pub email: String,
    pub username: String,
    pub email_confirmed: bool,
    pub need_password_reset: bool,
    pub mfa_enabled: bool,
    pub mfa_method: Option<String>,
    /// Which trusted caller the session was minted for
    pub client_identifier: String,
    #[serde(rename = "type")]
    pub token_type: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Claims embedded in a password-reset token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetClaims {
    pub email: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

/// JSON envelope the session cookie wraps around the token.
///
/// Refresh tokens are a known gap; the placeholder values are part of the
/// wire contract until rotation lands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnvelope {
    pub token: String,
    pub refresh_token: String,
    pub refresh_token_expires_in: i64,
}

impl SessionEnvelope {
    pub fn new(token: String) -> Self {
        Self {
            token,
            refresh_token: "NOT IMPLEMENTED".to_string(),
            refresh_token_expires_in: 0,
        }
    }
}

/// Mints and verifies the signed tokens that carry session and reset claims.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: i64,
}

impl TokenService {
    pub fn new(secret: &str, expiry_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        }
    }

    /// Token lifetime in seconds, as configured.
    pub fn expiry_seconds(&self) -> i64 {
        self.expiry_seconds
    }

    /// Mint a session token for a user, returning both the signed token and
    /// the claims inside it.
    ///
    /// `mfa_method` records how this particular session satisfied MFA, if it
    /// did; `None` means the user authenticated without a second factor.
    pub fn mint(
        &self,
        user: &User,
        device_count: usize,
        client_identifier: &str,
        mfa_method: Option<&str>,
    ) -> AuthResult<(String, SessionClaims)> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiry_seconds);

        // Possession of a registered authenticator or a confirmed email each
        // count as a second factor.
        let mfa_enabled = user.email_confirmed || device_count > 0;

        let claims = SessionClaims {
            sub: user.id,
            role: user.role,
            email: user.email.clone(),
            username: user.username.clone(),
            email_confirmed: user.email_confirmed,
            need_password_reset: user.need_password_reset,
            mfa_enabled,
            mfa_method: mfa_method.map(str::to_string),
            client_identifier: client_identifier.to_string(),
            token_type: TOKEN_TYPE_AUTH.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))?;

        Ok((token, claims))
    }

    /// Validate and decode a session token.
    pub fn verify(&self, token: &str) -> AuthResult<SessionClaims> {
        let claims: SessionClaims = self.decode_checked(token)?;
        if claims.token_type != TOKEN_TYPE_AUTH {
            return Err(AuthError::TokenTypeMismatch);
        }
        Ok(claims)
    }

    /// Mint a password-reset token bound to an email address.
    pub fn mint_reset_token(&self, email: &str) -> AuthResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiry_seconds);

        let claims = ResetClaims {
            email: email.to_string(),
            token_type: TOKEN_TYPE_RESET.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode reset token: {}", e))?;

        Ok(token)
    }

    /// Validate a reset token and return the email it is bound to.
    ///
    /// The `type` claim is checked before the email is trusted; a session
    /// token fed in here fails with `TokenTypeMismatch`.
    pub fn verify_reset_token(&self, token: &str) -> AuthResult<String> {
        let claims: ResetClaims = self.decode_checked(token)?;
        if claims.token_type != TOKEN_TYPE_RESET {
            return Err(AuthError::TokenTypeMismatch);
        }
        Ok(claims.email)
    }

    fn decode_checked<C: serde::de::DeserializeOwned>(&self, token: &str) -> AuthResult<C> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let data = decode::<C>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            }
        })?;

        Ok(data.claims)
    }
}
