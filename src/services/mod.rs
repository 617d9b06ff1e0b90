//! Services layer.
//!
//! Business logic for authentication ceremonies, one-time codes, session
//! tokens, and outbound delivery.

mod auth;
mod email;
pub mod error;
mod secret_code;
mod token;

pub use auth::{AuthService, IssuedSession, RegistrationRequest, StartOutcome};
pub use email::{MessageSender, MockMailer, SentMessage, SmtpMailer};
pub use error::{AuthError, AuthResult};
pub use secret_code::SecretCodeService;
pub use token::{
    ResetClaims, SessionClaims, SessionEnvelope, TokenService, TOKEN_TYPE_AUTH, TOKEN_TYPE_RESET,
};
