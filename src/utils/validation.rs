//! Input normalization helpers for identities.

use regex::Regex;

/// Usernames are stored lowercase; normalize before any lookup or create.
pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Emails are matched case-insensitively; normalize before lookup.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Basic shape check on an already-normalized email.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}
