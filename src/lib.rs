//! auth-core: Multi-factor authentication with WebAuthn ceremonies, one-time
//! email codes, and posture-aware session tokens.
pub mod config;
pub mod gate;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;
pub mod webauthn;

pub use config::{AuthConfig, Environment, SmtpConfig};
pub use gate::{AccessGate, Decision, DenyReason, GateConfig, LoginPosture};
pub use models::{Device, NewDevice, NewUser, PendingCode, User, UserRole};
pub use services::{
    AuthError, AuthResult, AuthService, IssuedSession, MessageSender, MockMailer,
    RegistrationRequest, SecretCodeService, SessionClaims, SessionEnvelope, SmtpMailer,
    StartOutcome, TokenService,
};
pub use store::{CredentialStore, InMemoryStore, StoreError, StoreResult};
pub use utils::{SessionCookie, SESSION_COOKIE_NAME};
pub use webauthn::{AttestationVerifier, MockVerifier, RelyingParty, WebAuthnService};
