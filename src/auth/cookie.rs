//! Refresh-token cookie attributes.

use std::{fmt, time::Duration};

use super::config::AuthConfig;

pub const REFRESH_COOKIE_NAME: &str = "refreshToken";
const COOKIE_PATH: &str = "/";
const EPOCH_EXPIRES: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("Strict"),
            Self::Lax => f.write_str("Lax"),
        }
    }
}

/// A `Set-Cookie` instruction for the refresh token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshCookie {
    pub value: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub domain: Option<String>,
    pub path: &'static str,
    pub max_age: Duration,
}

impl RefreshCookie {
    /// Whether this cookie deletes the refresh token on the client.
    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.value.is_empty() && self.max_age.is_zero()
    }
}

impl fmt::Display for RefreshCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{REFRESH_COOKIE_NAME}={}; Path={}",
            self.value, self.path
        )?;
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={domain}")?;
        }
        write!(f, "; Max-Age={}", self.max_age.as_secs())?;
        if self.is_removal() {
            write!(f, "; Expires={EPOCH_EXPIRES}")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        write!(f, "; SameSite={}", self.same_site)?;
        if self.secure {
            f.write_str("; Secure")?;
        }
        Ok(())
    }
}

/// Deployment-derived attributes shared by every refresh cookie.
#[derive(Clone, Debug)]
pub struct CookiePolicy {
    secure: bool,
    domain: Option<String>,
    max_age: Duration,
}

impl CookiePolicy {
    /// `max_age` equals the refresh-token lifetime so the cookie never outlives the token.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            secure: config.cookie_secure(),
            domain: config.cookie_domain().ok(),
            max_age: config.refresh_token_ttl(),
        }
    }

    #[must_use]
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    #[must_use]
    pub fn issue(&self, refresh_token: &str) -> RefreshCookie {
        RefreshCookie {
            value: refresh_token.to_string(),
            http_only: true,
            secure: self.secure,
            same_site: SameSite::Strict,
            domain: self.domain.clone(),
            path: COOKIE_PATH,
            max_age: self.max_age,
        }
    }

    #[must_use]
    pub fn clear(&self) -> RefreshCookie {
        RefreshCookie {
            value: String::new(),
            http_only: true,
            secure: self.secure,
            same_site: SameSite::Strict,
            domain: self.domain.clone(),
            path: COOKIE_PATH,
            max_age: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::config::DeploymentMode;
    use secrecy::SecretString;

    fn config() -> AuthConfig {
        AuthConfig::new(
            SecretString::from("access".to_string()),
            SecretString::from("refresh".to_string()),
            "https://shop.example.com".to_string(),
        )
    }

    #[test]
    fn production_cookie_is_strict_secure_and_bound_to_frontend() {
        let cookie = CookiePolicy::from_config(&config()).issue("token");
        assert!(cookie.http_only);
        assert!(cookie.secure);
        assert_eq!(cookie.same_site, SameSite::Strict);
        assert_eq!(cookie.domain.as_deref(), Some("shop.example.com"));
        assert_eq!(cookie.max_age.as_millis(), 1_209_600_000);
        assert_eq!(
            cookie.to_string(),
            "refreshToken=token; Path=/; Domain=shop.example.com; Max-Age=1209600; HttpOnly; SameSite=Strict; Secure"
        );
    }

    #[test]
    fn development_cookie_is_not_secure() {
        let config = config()
            .with_deployment_mode(DeploymentMode::Development)
            .with_client_url_local("http://localhost:3000".to_string());
        let cookie = CookiePolicy::from_config(&config).issue("token");
        assert!(!cookie.secure);
        assert_eq!(cookie.domain.as_deref(), Some("localhost"));
        assert!(!cookie.to_string().contains("Secure"));
    }

    #[test]
    fn max_age_follows_refresh_ttl() {
        let config = config().with_refresh_token_ttl(Duration::from_secs(600));
        let policy = CookiePolicy::from_config(&config);
        assert_eq!(policy.max_age(), Duration::from_secs(600));
    }

    #[test]
    fn cleared_cookie_expires_immediately() {
        let cookie = CookiePolicy::from_config(&config()).clear();
        assert!(cookie.is_removal());
        assert!(cookie.http_only);
        assert_eq!(
            cookie.to_string(),
            "refreshToken=; Path=/; Domain=shop.example.com; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Strict; Secure"
        );
    }
}
