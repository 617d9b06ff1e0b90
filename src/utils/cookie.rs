//! Signed session cookie envelope.
//!
//! The cookie value is `<base64 payload>.<hex signature>`: the payload is the
//! JSON session envelope, the signature an HMAC-SHA256 over the encoded
//! payload keyed with the cookie secret. This signing layer is independent of
//! the session token's own signature.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::services::error::{AuthError, AuthResult};
use crate::services::SessionEnvelope;

type HmacSha256 = Hmac<Sha256>;

/// Cookie the session envelope travels in.
pub const SESSION_COOKIE_NAME: &str = "Authorization";

/// A sealed cookie value plus the attributes the HTTP layer must set on it.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: &'static str,
    pub value: String,
    pub max_age_seconds: i64,
    pub http_only: bool,
}

/// Seal an envelope into a signed cookie value.
pub fn seal(
    envelope: &SessionEnvelope,
    secret: &str,
    max_age_seconds: i64,
) -> AuthResult<SessionCookie> {
    let json = serde_json::to_vec(envelope)
        .map_err(|e| anyhow::anyhow!("Failed to serialize session envelope: {}", e))?;
    let payload = STANDARD.encode(json);
    let signature = sign(secret, &payload)?;

    Ok(SessionCookie {
        name: SESSION_COOKIE_NAME,
        value: format!("{}.{}", payload, signature),
        max_age_seconds,
        http_only: true,
    })
}

/// Verify a raw cookie value and recover the envelope.
///
/// Any structural defect (missing separator, bad base64, bad JSON) and any
/// signature mismatch is reported as `TokenInvalid`.
pub fn open(raw: &str, secret: &str) -> AuthResult<SessionEnvelope> {
    let Some((payload, signature)) = raw.rsplit_once('.') else {
        return Err(AuthError::TokenInvalid);
    };

    let expected = sign(secret, payload)?;

    // Constant time comparison
    let expected_bytes = expected.as_bytes();
    let signature_bytes = signature.as_bytes();
    if expected_bytes.len() != signature_bytes.len() {
        return Err(AuthError::TokenInvalid);
    }
    if !bool::from(expected_bytes.ct_eq(signature_bytes)) {
        return Err(AuthError::TokenInvalid);
    }

    let json = STANDARD
        .decode(payload)
        .map_err(|_| AuthError::TokenInvalid)?;
    serde_json::from_slice(&json).map_err(|_| AuthError::TokenInvalid)
}

fn sign(secret: &str, payload: &str) -> AuthResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
