//! User model - the identity root every auth operation revolves around.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Account role carried into session claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
    Guest,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
            UserRole::Guest => "guest",
        }
    }
}

/// A hashed one-time code together with its issuance time.
///
/// Hash and timestamp always travel together; a single `Option<PendingCode>`
/// on the user makes a half-set pair unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCode {
    pub hash: String,
    pub issued_at: DateTime<Utc>,
}

impl PendingCode {
    pub fn is_expired(&self, window_seconds: i64) -> bool {
        Utc::now() - self.issued_at > Duration::seconds(window_seconds)
    }
}

/// User entity.
///
/// `current_challenge` holds the single outstanding ceremony challenge;
/// starting a new ceremony overwrites it.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: UserRole,
    pub email_confirmed: bool,
    pub need_password_reset: bool,
    pub pending_code: Option<PendingCode>,
    pub current_challenge: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Fields for creating a user; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub password_hash: Option<String>,
    pub email_confirmed: bool,
    pub need_password_reset: bool,
}

impl NewUser {
    /// Account shell created when an unknown username starts registration.
    pub fn placeholder(username: String) -> Self {
        Self {
            username,
            email: String::new(),
            role: UserRole::User,
            password_hash: None,
            email_confirmed: false,
            need_password_reset: true,
        }
    }
}
