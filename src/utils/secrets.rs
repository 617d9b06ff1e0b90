//! One-way hashing for passwords and one-time codes.
//!
//! Both kinds of secret go through the same Argon2id path with a generated
//! salt embedded in the hash string.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Newtype for plaintext secrets to prevent accidental logging.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(…)")
    }
}

/// Newtype for a stored secret hash.
#[derive(Debug, Clone)]
pub struct SecretHash(String);

impl SecretHash {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Hash a secret with Argon2id and a freshly generated salt.
///
/// The salt is embedded in the returned hash string.
pub fn hash_secret(secret: &Secret) -> Result<SecretHash, anyhow::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let hash = argon2
        .hash_password(secret.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash secret: {}", e))?
        .to_string();

    Ok(SecretHash::new(hash))
}

/// Verify a secret against a stored hash.
///
/// Returns Ok(()) on a match, Err otherwise (including unparseable hashes).
pub fn verify_secret(secret: &Secret, stored: &SecretHash) -> Result<(), anyhow::Error> {
    let parsed = PasswordHash::new(stored.as_str())
        .map_err(|e| anyhow::anyhow!("Invalid secret hash format: {}", e))?;

    Argon2::default()
        .verify_password(secret.as_str().as_bytes(), &parsed)
        .map_err(|_| anyhow::anyhow!("Secret verification failed"))
}
