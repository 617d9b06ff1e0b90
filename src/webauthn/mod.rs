//! Public-key authenticator ceremonies.

pub mod types;

mod service;
mod verifier;

pub use service::{RelyingParty, WebAuthnService};
pub use verifier::{
    AttestationVerifier, CeremonyExpectations, MockVerifier, RegisteredCredential,
    VerifiedAuthentication, VerifiedRegistration,
};
