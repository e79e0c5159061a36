//! Password hashing for registered users (argon2id, PHC string format).

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;

#[derive(Debug, thiserror::Error)]
#[error("Password hashing failed: {0}")]
pub struct HashError(String);

pub struct Hasher;

impl Hasher {
    /// Hash a password with a fresh random salt.
    pub fn hash_password(password: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashError(e.to_string()))
    }

    /// [`Hasher::hash_password`] on tokio's blocking pool, so request
    /// handlers never run argon2 on an async worker.
    pub async fn hash_password_async(password: String) -> Result<String, HashError> {
        tokio::task::spawn_blocking(move || Self::hash_password(&password))
            .await
            .map_err(|e| HashError(format!("hashing task failed: {e}")))?
    }
}
