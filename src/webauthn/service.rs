//! Ceremony driver for authenticator registration and login.
//!
//! Owns the per-user challenge slot, the device records behind each
//! credential, and the counter check that catches replayed assertions.
//! Cryptographic verification itself is delegated to an
//! [`AttestationVerifier`].

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;

use crate::models::{Device, NewDevice, User};
use crate::services::error::{AuthError, AuthResult};
use crate::store::CredentialStore;
use crate::webauthn::types::{
    AuthenticationOptions, AuthenticationResponse, AuthenticatorSelection, CredentialDescriptor,
    CredentialParameter, RegistrationOptions, RegistrationResponse, RpEntity, UserEntity,
};
use crate::webauthn::verifier::{AttestationVerifier, CeremonyExpectations};

/// Ceremony timeout handed to the browser, in milliseconds.
const CEREMONY_TIMEOUT_MS: u32 = 60_000;
/// ES256 and RS256.
const SUPPORTED_ALGORITHMS: [i32; 2] = [-7, -257];
const ATTESTATION_CONVEYANCE: &str = "none";
const CREDENTIAL_KIND: &str = "public-key";

/// The relying party identity every ceremony is bound to.
#[derive(Debug, Clone)]
pub struct RelyingParty {
    pub name: String,
    pub id: String,
    pub origin: String,
}

pub struct WebAuthnService {
    store: Arc<dyn CredentialStore>,
    verifier: Arc<dyn AttestationVerifier>,
    rp: RelyingParty,
}

impl WebAuthnService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        verifier: Arc<dyn AttestationVerifier>,
        rp: RelyingParty,
    ) -> Self {
        Self {
            store,
            verifier,
            rp,
        }
    }

    /// Build registration options and store the fresh challenge on the user,
    /// replacing any previous one.
    pub async fn begin_registration(&self, user_id: i64) -> AuthResult<RegistrationOptions> {
        let mut user = self.load_user(user_id).await?;
        let devices = self.store.devices_for_user(user_id).await?;

        let challenge = generate_challenge();
        let options = RegistrationOptions {
            challenge: challenge.clone(),
            rp: RpEntity {
                name: self.rp.name.clone(),
                id: self.rp.id.clone(),
            },
            user: UserEntity {
                id: user.id.to_string(),
                name: user.username.clone(),
                display_name: user.username.clone(),
            },
            pub_key_cred_params: SUPPORTED_ALGORITHMS
                .iter()
                .map(|&alg| CredentialParameter {
                    alg,
                    kind: CREDENTIAL_KIND.to_string(),
                })
                .collect(),
            timeout: CEREMONY_TIMEOUT_MS,
            attestation: ATTESTATION_CONVEYANCE.to_string(),
            // Listing registered credential ids keeps an authenticator from
            // enrolling the same credential twice.
            exclude_credentials: devices.iter().map(descriptor).collect(),
            authenticator_selection: AuthenticatorSelection {
                resident_key: "preferred".to_string(),
                user_verification: "preferred".to_string(),
            },
        };

        user.current_challenge = Some(challenge);
        self.store.update_user(&user).await?;

        Ok(options)
    }

    /// Verify a registration response and, on success, record the new device.
    ///
    /// Returns the user and whether verification succeeded. Fails fast with
    /// `NoActiveChallenge` when no ceremony is outstanding; in every other
    /// case the stored challenge is cleared before the outcome is reported.
    #[tracing::instrument(skip(self, response), fields(user_id = user_id))]
    pub async fn finish_registration(
        &self,
        user_id: i64,
        device_name: &str,
        response: &RegistrationResponse,
    ) -> AuthResult<(User, bool)> {
        let mut user = self.load_user(user_id).await?;
        let devices = self.store.devices_for_user(user_id).await?;

        let Some(challenge) = user.current_challenge.clone() else {
            return Err(AuthError::NoActiveChallenge);
        };

        let outcome = self
            .verifier
            .verify_registration(response, &self.expectations(challenge))
            .await;

        // The challenge is single-use: clear it before acting on the outcome
        // so no failure path leaves it replayable.
        user.current_challenge = None;
        self.store.update_user(&user).await?;

        let verification = match outcome {
            Ok(verification) => verification,
            Err(e) => {
                tracing::warn!(error = %e, "Registration response could not be processed");
                return Err(AuthError::VerificationFailed(e.to_string()));
            }
        };

        if verification.verified {
            if let Some(credential) = verification.credential {
                let already_registered = devices
                    .iter()
                    .any(|device| device.credential_id == credential.credential_id);

                if !already_registered {
                    self.store
                        .create_device(NewDevice {
                            user_id,
                            name: device_name.to_string(),
                            credential_id: credential.credential_id,
                            public_key: credential.public_key,
                            counter: credential.counter,
                            transports: response.response.transports.clone(),
                        })
                        .await?;
                    tracing::info!(device_name, "Registered new authenticator");
                }
            }
        }

        Ok((user, verification.verified))
    }

    /// Build authentication options scoped to the user's registered devices
    /// and store the fresh challenge, replacing any previous one.
    pub async fn begin_authentication(&self, user_id: i64) -> AuthResult<AuthenticationOptions> {
        let mut user = self.load_user(user_id).await?;
        let devices = self.store.devices_for_user(user_id).await?;

        let challenge = generate_challenge();
        let options = AuthenticationOptions {
            challenge: challenge.clone(),
            timeout: CEREMONY_TIMEOUT_MS,
            rp_id: self.rp.id.clone(),
            allow_credentials: devices.iter().map(descriptor).collect(),
            user_verification: "required".to_string(),
        };

        user.current_challenge = Some(challenge);
        self.store.update_user(&user).await?;

        Ok(options)
    }

    /// Verify an authentication response against the device it names.
    ///
    /// The device must belong to the user and its signature counter must
    /// strictly advance; a counter that stands still or regresses means a
    /// replayed or cloned credential.
    #[tracing::instrument(skip(self, response), fields(user_id = user_id))]
    pub async fn finish_authentication(
        &self,
        user_id: i64,
        response: &AuthenticationResponse,
    ) -> AuthResult<(User, bool)> {
        let credential_id = URL_SAFE_NO_PAD
            .decode(&response.raw_id)
            .map_err(|_| AuthError::DeviceNotRegistered)?;

        let mut user = self.load_user(user_id).await?;
        let Some(mut device) = self
            .store
            .find_device_by_credential_id(user_id, &credential_id)
            .await?
        else {
            return Err(AuthError::DeviceNotRegistered);
        };

        let Some(challenge) = user.current_challenge.clone() else {
            return Err(AuthError::NoActiveChallenge);
        };

        let outcome = self
            .verifier
            .verify_authentication(
                response,
                &self.expectations(challenge),
                &device.public_key,
                device.counter,
            )
            .await;

        user.current_challenge = None;
        self.store.update_user(&user).await?;

        let verification = match outcome {
            Ok(verification) => verification,
            Err(e) => {
                tracing::warn!(error = %e, "Authentication response could not be processed");
                return Err(AuthError::VerificationFailed(e.to_string()));
            }
        };

        if verification.verified {
            if verification.new_counter <= device.counter {
                tracing::warn!(
                    device_id = device.id,
                    stored = device.counter,
                    reported = verification.new_counter,
                    "Authenticator counter did not advance"
                );
                return Err(AuthError::VerificationFailed(
                    "authenticator counter did not advance".to_string(),
                ));
            }

            device.counter = verification.new_counter;
            self.store.update_device(&device).await?;
        }

        Ok((user, verification.verified))
    }

    /// Registered devices for a user.
    pub async fn devices(&self, user_id: i64) -> AuthResult<Vec<Device>> {
        Ok(self.store.devices_for_user(user_id).await?)
    }

    /// Remove one of the user's devices.
    pub async fn remove_device(&self, user_id: i64, device_id: i64) -> AuthResult<()> {
        let removed = self.store.delete_device(user_id, device_id).await?;
        if !removed {
            return Err(AuthError::DeviceNotRegistered);
        }
        tracing::info!(user_id, device_id, "Removed authenticator");
        Ok(())
    }

    async fn load_user(&self, user_id: i64) -> AuthResult<User> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    fn expectations(&self, challenge: String) -> CeremonyExpectations {
        CeremonyExpectations {
            challenge,
            origin: self.rp.origin.clone(),
            rp_id: self.rp.id.clone(),
        }
    }
}

/// 32 random bytes, base64url. Unpadded to match the browser encoding of
/// challenge values.
fn generate_challenge() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

fn descriptor(device: &Device) -> CredentialDescriptor {
    CredentialDescriptor {
        id: URL_SAFE_NO_PAD.encode(&device.credential_id),
        kind: CREDENTIAL_KIND.to_string(),
        transports: device.transports.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenges_are_distinct_and_urlsafe() {
        let a = generate_challenge();
        let b = generate_challenge();
        assert_ne!(a, b);
        assert_eq!(URL_SAFE_NO_PAD.decode(&a).unwrap().len(), 32);
    }
}
