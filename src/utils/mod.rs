pub mod cookie;
pub mod secrets;
pub mod validation;

pub use cookie::{SessionCookie, SESSION_COOKIE_NAME};
pub use secrets::{hash_secret, verify_secret, Secret, SecretHash};
pub use validation::{normalize_email, normalize_username, valid_email};
