//! Signed, expiring access and refresh tokens.
//!
//! Both token kinds are HS256 JWTs carrying `{ id, iat, exp }`. They are signed
//! with independent secrets, so a leaked access secret cannot mint refresh tokens
//! and vice versa. Verification is a pure function of secret, claims and clock.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use super::{config::AuthConfig, error::AuthError, model::UserId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub id: UserId,
    pub iat: u64,
    pub exp: u64,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

pub struct TokenCodec {
    access: SigningKeys,
    refresh: SigningKeys,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl TokenCodec {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            access: SigningKeys::from_secret(config.jwt_secret().expose_secret().as_bytes()),
            refresh: SigningKeys::from_secret(config.refresh_secret().expose_secret().as_bytes()),
            access_ttl: config.access_token_ttl(),
            refresh_ttl: config.refresh_token_ttl(),
            validation,
        }
    }

    #[must_use]
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    #[must_use]
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Mint an access token for `subject` valid for `ttl`.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if the claims cannot be signed.
    pub fn issue_access(&self, subject: UserId, ttl: Duration) -> Result<String, AuthError> {
        sign(&self.access, subject, ttl, now_unix())
    }

    /// Mint a refresh token for `subject` valid for `ttl`.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if the claims cannot be signed.
    pub fn issue_refresh(&self, subject: UserId, ttl: Duration) -> Result<String, AuthError> {
        sign(&self.refresh, subject, ttl, now_unix())
    }

    /// Verify a refresh token and return its subject.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidToken` on a bad signature, elapsed expiry or malformed token.
    pub fn verify_refresh(&self, token: &str) -> Result<UserId, AuthError> {
        self.verify(&self.refresh, token)
    }

    /// Verify an access token and return its subject.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidToken` on a bad signature, elapsed expiry or malformed token.
    pub fn verify_access(&self, token: &str) -> Result<UserId, AuthError> {
        self.verify(&self.access, token)
    }

    fn verify(&self, keys: &SigningKeys, token: &str) -> Result<UserId, AuthError> {
        match decode::<TokenClaims>(token.trim(), &keys.decoding, &self.validation) {
            Ok(data) => Ok(data.claims.id),
            Err(err) => {
                match err.kind() {
                    ErrorKind::ExpiredSignature => debug!("Rejected expired token"),
                    kind => debug!("Rejected token: {kind:?}"),
                }
                Err(AuthError::InvalidToken)
            }
        }
    }
}

fn sign(keys: &SigningKeys, subject: UserId, ttl: Duration, now: u64) -> Result<String, AuthError> {
    let claims = TokenClaims {
        id: subject,
        iat: now,
        exp: now.saturating_add(ttl.as_secs()),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
        .map_err(|err| AuthError::Internal(anyhow::anyhow!("failed to sign token: {err}")))
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use secrecy::SecretString;

    fn codec() -> TokenCodec {
        let config = AuthConfig::new(
            SecretString::from("access-secret".to_string()),
            SecretString::from("refresh-secret".to_string()),
            "https://shop.example.com".to_string(),
        );
        TokenCodec::new(&config)
    }

    #[test]
    fn refresh_round_trip_returns_subject() -> Result<()> {
        let codec = codec();
        let token = codec.issue_refresh(7, codec.refresh_ttl())?;
        assert_eq!(codec.verify_refresh(&token)?, 7);
        Ok(())
    }

    #[test]
    fn access_and_refresh_secrets_are_not_interchangeable() -> Result<()> {
        let codec = codec();
        let access = codec.issue_access(7, codec.access_ttl())?;
        let refresh = codec.issue_refresh(7, codec.refresh_ttl())?;

        assert!(matches!(codec.verify_refresh(&access), Err(AuthError::InvalidToken)));
        assert!(matches!(codec.verify_access(&refresh), Err(AuthError::InvalidToken)));
        assert_eq!(codec.verify_access(&access)?, 7);
        Ok(())
    }

    #[test]
    fn expired_refresh_token_is_rejected() -> Result<()> {
        let codec = codec();
        let fifteen_days_ago = now_unix() - 15 * 24 * 60 * 60;
        let token = sign(&codec.refresh, 7, codec.refresh_ttl(), fifteen_days_ago)?;
        assert!(matches!(codec.verify_refresh(&token), Err(AuthError::InvalidToken)));
        Ok(())
    }

    #[test]
    fn tampered_refresh_token_is_rejected() -> Result<()> {
        let codec = codec();
        let token = codec.issue_refresh(7, codec.refresh_ttl())?;
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        // Re-encode the payload claiming another subject but keep the old signature.
        let forged = TokenClaims {
            id: 1,
            iat: now_unix(),
            exp: now_unix() + 60,
        };
        let forged_token = encode(
            &Header::new(Algorithm::HS256),
            &forged,
            &EncodingKey::from_secret(b"attacker"),
        )?;
        if let (Some(payload), Some(slot)) = (forged_token.split('.').nth(1), parts.get_mut(1)) {
            *slot = payload.to_string();
        }
        assert!(matches!(
            codec.verify_refresh(&parts.join(".")),
            Err(AuthError::InvalidToken)
        ));
        Ok(())
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let codec = codec();
        for token in ["", "not-a-jwt", "a.b.c", "a.b"] {
            assert!(matches!(codec.verify_refresh(token), Err(AuthError::InvalidToken)));
        }
    }

    #[test]
    fn claims_carry_expiry_from_ttl() -> Result<()> {
        let codec = codec();
        let token = sign(&codec.access, 9, Duration::from_secs(3600), 1_000)?;
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let data = decode::<TokenClaims>(&token, &codec.access.decoding, &validation)?;
        assert_eq!(
            data.claims,
            TokenClaims {
                id: 9,
                iat: 1_000,
                exp: 4_600
            }
        );
        Ok(())
    }
}
