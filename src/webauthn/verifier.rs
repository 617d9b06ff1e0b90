//! Attestation verification boundary.
//!
//! Implementations own the cryptographic checks on ceremony responses;
//! challenge bookkeeping, device lookups, and counter enforcement stay in the
//! service so every implementation gets them for free.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::webauthn::types::{
    AssertionResponse, AttestationResponse, AuthenticationResponse, RegistrationResponse,
};

/// What the authenticator is expected to have signed over.
#[derive(Debug, Clone)]
pub struct CeremonyExpectations {
    pub challenge: String,
    pub origin: String,
    pub rp_id: String,
}

/// Outcome of registration verification.
#[derive(Debug, Clone)]
pub struct VerifiedRegistration {
    pub verified: bool,
    /// Present only when `verified` is true.
    pub credential: Option<RegisteredCredential>,
}

/// Credential material extracted from a verified attestation.
#[derive(Debug, Clone)]
pub struct RegisteredCredential {
    pub credential_id: Vec<u8>,
    pub public_key: Vec<u8>,
    pub counter: u32,
}

/// Outcome of authentication verification.
#[derive(Debug, Clone)]
pub struct VerifiedAuthentication {
    pub verified: bool,
    pub new_counter: u32,
}

#[async_trait]
pub trait AttestationVerifier: Send + Sync {
    /// Check an attestation response against the expected ceremony values.
    ///
    /// `Err` means the response could not be processed at all (malformed
    /// payload); a well-formed response that fails its checks comes back as
    /// `Ok` with `verified: false`.
    async fn verify_registration(
        &self,
        response: &RegistrationResponse,
        expected: &CeremonyExpectations,
    ) -> Result<VerifiedRegistration, anyhow::Error>;

    /// Check an assertion response against the expected ceremony values and
    /// the stored credential material.
    async fn verify_authentication(
        &self,
        response: &AuthenticationResponse,
        expected: &CeremonyExpectations,
        public_key: &[u8],
        counter: u32,
    ) -> Result<VerifiedAuthentication, anyhow::Error>;
}

/// Mock verifier for testing.
///
/// Stands in for real attestation cryptography with transparent rules: a
/// response verifies when its `clientDataJSON` field equals the expected
/// challenge, the credential id is the decoded `rawId`, the public key is the
/// decoded `attestationObject`, and an assertion's reported counter is its
/// `signature` field parsed as a number. Malformed fields fail with `Err`,
/// like a parse failure inside a real implementation.
pub struct MockVerifier;

impl MockVerifier {
    /// Build a registration response the mock accepts for `challenge`.
    pub fn registration_response(
        credential_id: &[u8],
        public_key: &[u8],
        challenge: &str,
    ) -> RegistrationResponse {
        let encoded_id = URL_SAFE_NO_PAD.encode(credential_id);
        RegistrationResponse {
            id: encoded_id.clone(),
            raw_id: encoded_id,
            response: AttestationResponse {
                client_data_json: challenge.to_string(),
                attestation_object: URL_SAFE_NO_PAD.encode(public_key),
                transports: Some(vec!["internal".to_string()]),
            },
            kind: "public-key".to_string(),
        }
    }

    /// Build an authentication response the mock accepts for `challenge`,
    /// reporting `counter` as the authenticator's usage count.
    pub fn authentication_response(
        credential_id: &[u8],
        counter: u32,
        challenge: &str,
    ) -> AuthenticationResponse {
        let encoded_id = URL_SAFE_NO_PAD.encode(credential_id);
        AuthenticationResponse {
            id: encoded_id.clone(),
            raw_id: encoded_id,
            response: AssertionResponse {
                client_data_json: challenge.to_string(),
                authenticator_data: URL_SAFE_NO_PAD.encode(b"authenticator-data"),
                signature: counter.to_string(),
                user_handle: None,
            },
            kind: "public-key".to_string(),
        }
    }
}

#[async_trait]
impl AttestationVerifier for MockVerifier {
    async fn verify_registration(
        &self,
        response: &RegistrationResponse,
        expected: &CeremonyExpectations,
    ) -> Result<VerifiedRegistration, anyhow::Error> {
        let credential_id = URL_SAFE_NO_PAD
            .decode(&response.raw_id)
            .map_err(|e| anyhow::anyhow!("Malformed credential id: {}", e))?;
        let public_key = URL_SAFE_NO_PAD
            .decode(&response.response.attestation_object)
            .map_err(|e| anyhow::anyhow!("Malformed attestation object: {}", e))?;

        if response.response.client_data_json != expected.challenge {
            return Ok(VerifiedRegistration {
                verified: false,
                credential: None,
            });
        }

        Ok(VerifiedRegistration {
            verified: true,
            credential: Some(RegisteredCredential {
                credential_id,
                public_key,
                counter: 0,
            }),
        })
    }

    async fn verify_authentication(
        &self,
        response: &AuthenticationResponse,
        expected: &CeremonyExpectations,
        _public_key: &[u8],
        _counter: u32,
    ) -> Result<VerifiedAuthentication, anyhow::Error> {
        let new_counter: u32 = response
            .response
            .signature
            .parse()
            .map_err(|e| anyhow::anyhow!("Malformed assertion signature: {}", e))?;

        Ok(VerifiedAuthentication {
            verified: response.response.client_data_json == expected.challenge,
            new_counter,
        })
    }
}
