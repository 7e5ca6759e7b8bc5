//! One-way hashing for stored member secrets.
//!
//! Uses bcrypt with a configurable cost. Both operations are CPU bound and
//! deliberately slow, so they run on the blocking thread pool instead of the
//! async workers.

use bcrypt::{hash, verify};
use thiserror::Error;

/// Failures produced by [`PasswordHasher`].
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Hashing could not complete. Never caused by the secret's content.
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),
    /// Secret does not match the stored hash, or the hash is unusable.
    #[error("Password mismatch")]
    Mismatch,
}

/// Salted bcrypt hasher.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl PasswordHasher {
    /// Creates a hasher with an explicit bcrypt cost.
    ///
    /// # Arguments
    /// * `cost` - bcrypt work factor (4..=31)
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hashes a plain text secret before it is stored.
    ///
    /// # Returns
    /// Modular crypt formatted bcrypt hash (salt included)
    ///
    /// # Errors
    /// Returns `PasswordError::HashingFailed` on an internal bcrypt or
    /// worker failure
    pub async fn hash(&self, secret: &str) -> Result<String, PasswordError> {
        let secret = secret.to_owned();
        let cost = self.cost;

        tokio::task::spawn_blocking(move || hash(secret, cost))
            .await
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    /// Checks a plain text secret against a stored hash.
    ///
    /// Every failure collapses into `PasswordError::Mismatch` so callers
    /// cannot tell a wrong secret from a corrupt hash.
    pub async fn verify(&self, secret: &str, stored_hash: &str) -> Result<(), PasswordError> {
        let secret = secret.to_owned();
        let stored_hash = stored_hash.to_owned();

        match tokio::task::spawn_blocking(move || verify(secret, &stored_hash)).await {
            Ok(Ok(true)) => Ok(()),
            _ => Err(PasswordError::Mismatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4)
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = hasher();
        let hashed = hasher.hash("pw").await.unwrap();

        assert!(hashed.starts_with("$2"));
        assert_ne!(hashed, "pw");
        assert!(hasher.verify("pw", &hashed).await.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_secret_is_mismatch() {
        let hasher = hasher();
        let hashed = hasher.hash("correct horse").await.unwrap();

        let result = hasher.verify("battery staple", &hashed).await;
        assert!(matches!(result, Err(PasswordError::Mismatch)));
    }

    #[tokio::test]
    async fn test_same_secret_is_salted() {
        let hasher = hasher();
        let first = hasher.hash("Password1").await.unwrap();
        let second = hasher.hash("Password1").await.unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("Password1", &first).await.is_ok());
        assert!(hasher.verify("Password1", &second).await.is_ok());
    }

    #[tokio::test]
    async fn test_corrupt_hash_is_mismatch() {
        let result = hasher().verify("pw", "not-a-bcrypt-hash").await;
        assert!(matches!(result, Err(PasswordError::Mismatch)));
    }

    #[tokio::test]
    async fn test_empty_and_unicode_secrets() {
        let hasher = hasher();

        let empty = hasher.hash("").await.unwrap();
        assert!(hasher.verify("", &empty).await.is_ok());

        let unicode = hasher.hash("비밀번호123").await.unwrap();
        assert!(hasher.verify("비밀번호123", &unicode).await.is_ok());
        assert!(hasher.verify("비밀번호124", &unicode).await.is_err());
    }
}
