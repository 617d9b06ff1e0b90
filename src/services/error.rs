use crate::gate::DenyReason;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("No current challenge exists")]
    NoActiveChallenge,

    #[error("Authenticator is not registered with this site")]
    DeviceNotRegistered,

    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Code expired")]
    CodeExpired,

    #[error("Incorrect code")]
    CodeIncorrect,

    #[error("No code present")]
    NoCodePresent,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Token expired")]
    TokenExpired,

    #[error("Unexpected token type")]
    TokenTypeMismatch,

    #[error("Access denied: {0}")]
    Denied(DenyReason),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Email error: {0}")]
    Delivery(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;
