//! Common test utilities for auth-core integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Once;

use auth_core::webauthn::RelyingParty;
use auth_core::{
    AccessGate, AuthService, InMemoryStore, MockMailer, MockVerifier, RegistrationRequest,
    SecretCodeService, StartOutcome, TokenService, User, WebAuthnService,
};

pub const TOKEN_EXPIRY_SECONDS: i64 = 3600;
pub const CODE_EXPIRY_SECONDS: i64 = 600;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,auth_core=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// The full service stack wired against the in-memory store, with mocked
/// ceremony verification and mocked mail delivery.
pub struct TestHarness {
    pub store: Arc<InMemoryStore>,
    pub mailer: Arc<MockMailer>,
    pub tokens: Arc<TokenService>,
    pub webauthn: Arc<WebAuthnService>,
    pub auth: AuthService,
    pub codes: SecretCodeService,
}

/// Build the stack with MFA required for every account.
pub fn spawn_harness() -> TestHarness {
    spawn_harness_with(true)
}

pub fn spawn_harness_with(mfa_required: bool) -> TestHarness {
    init_tracing();

    let store = Arc::new(InMemoryStore::new());
    let mailer = Arc::new(MockMailer::new());
    let tokens = Arc::new(TokenService::new("test-jwt-secret", TOKEN_EXPIRY_SECONDS));
    let webauthn = Arc::new(WebAuthnService::new(
        store.clone(),
        Arc::new(MockVerifier),
        RelyingParty {
            name: "auth-core - test".to_string(),
            id: "localhost".to_string(),
            origin: "http://localhost:3000".to_string(),
        },
    ));
    let auth = AuthService::new(
        store.clone(),
        webauthn.clone(),
        tokens.clone(),
        mailer.clone(),
        AccessGate::new(mfa_required),
        "http://localhost:3000".to_string(),
        "test-cookie-secret".to_string(),
    );
    let codes = SecretCodeService::new(store.clone(), mailer.clone(), CODE_EXPIRY_SECONDS);

    TestHarness {
        store,
        mailer,
        tokens,
        webauthn,
        auth,
        codes,
    }
}

/// Credential id the test helpers enroll for a username.
pub fn credential_id_for(username: &str) -> Vec<u8> {
    format!("cred-{}", username).into_bytes()
}

/// Register a complete account: enroll the first authenticator, then set the
/// email and password. Returns the stored user.
pub async fn register_account(
    harness: &TestHarness,
    username: &str,
    email: &str,
    password: &str,
) -> User {
    let outcome = harness
        .auth
        .start(username, false)
        .await
        .expect("Failed to start ceremony");
    let StartOutcome::RegisterUser(options) = outcome else {
        panic!("Expected a fresh registration ceremony for {}", username);
    };

    let response = MockVerifier::registration_response(
        &credential_id_for(username),
        b"test-public-key",
        &options.challenge,
    );

    harness
        .auth
        .finish_registration(RegistrationRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            device_name: "Test authenticator".to_string(),
            response,
        })
        .await
        .expect("Failed to finish registration")
}

/// Body prefix the verification mail carries before the one-time code.
pub const CODE_BODY_PREFIX: &str = "Please copy the following code to verify your email: ";

/// Pull the one-time code out of a verification mail body.
pub fn extract_code(body: &str) -> String {
    body.strip_prefix(CODE_BODY_PREFIX)
        .expect("Verification mail body did not carry a code")
        .to_string()
}

/// Issue a verification code, read it back from the mock mailer, and validate
/// it. Returns the user with the email confirmed.
pub async fn confirm_email(harness: &TestHarness, user_id: i64) -> User {
    harness
        .codes
        .issue(user_id, false)
        .await
        .expect("Failed to issue verification code");
    let sent = harness.mailer.sent();
    let code = extract_code(&sent.last().expect("No verification mail recorded").body);
    harness
        .codes
        .validate(user_id, &code)
        .await
        .expect("Failed to validate verification code")
}

/// Run a full login ceremony for a registered account, asserting success.
pub async fn login(harness: &TestHarness, username: &str, counter: u32) -> User {
    let outcome = harness
        .auth
        .start(username, false)
        .await
        .expect("Failed to start ceremony");
    let StartOutcome::Login(options) = outcome else {
        panic!("Expected a login ceremony for {}", username);
    };

    let response = MockVerifier::authentication_response(
        &credential_id_for(username),
        counter,
        &options.challenge,
    );

    harness
        .auth
        .finish_login(username, &response)
        .await
        .expect("Failed to finish login")
}
