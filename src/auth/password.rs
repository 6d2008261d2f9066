//! Password hashing and verification.
//!
//! Passwords are stored as Argon2id PHC strings (salt embedded). Verification
//! goes through `PasswordVerifier`, which compares in constant time.

use anyhow::{Result, anyhow};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;
use tracing::warn;

#[derive(Clone, Default)]
pub struct CredentialVerifier {
    argon2: Argon2<'static>,
}

impl CredentialVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `raw_password` against `stored_hash`. A mismatch is `false`, not an error.
    #[must_use]
    pub fn verify(&self, raw_password: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            warn!("Stored password hash is not a valid PHC string");
            return false;
        };
        self.argon2
            .verify_password(raw_password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Hash a new password with a fresh random salt.
    ///
    /// # Errors
    /// Returns an error if Argon2 fails to produce a hash.
    pub fn hash(&self, raw_password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(raw_password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| anyhow!("failed to hash password"))
    }

    /// `verify` on the blocking pool; Argon2 is too slow for the async workers.
    pub(crate) async fn verify_blocking(&self, raw_password: &str, stored_hash: &str) -> Result<bool> {
        let verifier = self.clone();
        let raw_password = raw_password.to_string();
        let stored_hash = stored_hash.to_string();
        tokio::task::spawn_blocking(move || verifier.verify(&raw_password, &stored_hash))
            .await
            .map_err(|err| anyhow!("password verification task failed: {err}"))
    }

    pub(crate) async fn hash_blocking(&self, raw_password: &str) -> Result<String> {
        let verifier = self.clone();
        let raw_password = raw_password.to_string();
        tokio::task::spawn_blocking(move || verifier.hash(&raw_password))
            .await
            .map_err(|err| anyhow!("password hashing task failed: {err}"))?
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::CredentialVerifier;

    #[test]
    fn hash_and_verify_round_trip() {
        let verifier = CredentialVerifier::new();
        let hash = verifier.hash("correct").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verifier.verify("correct", &hash));
        assert!(!verifier.verify("incorrect", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let verifier = CredentialVerifier::new();
        let first = verifier.hash("correct").unwrap();
        let second = verifier.hash("correct").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_hash_is_a_mismatch() {
        let verifier = CredentialVerifier::new();
        assert!(!verifier.verify("correct", "correct"));
        assert!(!verifier.verify("correct", ""));
    }

    #[tokio::test]
    async fn blocking_helpers_match_sync_results() {
        let verifier = CredentialVerifier::new();
        let hash = verifier.hash_blocking("correct").await.unwrap();
        assert!(verifier.verify_blocking("correct", &hash).await.unwrap());
        assert!(!verifier.verify_blocking("wrong", &hash).await.unwrap());
    }
}
