//! Auth configuration passed in at construction time.

use anyhow::{Result, anyhow, bail};
use secrecy::{ExposeSecret, SecretString};
use std::{fmt, str::FromStr, time::Duration};
use url::Url;

pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);
const DEFAULT_CLIENT_URL_LOCAL: &str = "http://localhost:3000";

/// Deployment context; decides the cookie `Secure` flag and which frontend origin applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeploymentMode {
    Development,
    #[default]
    Production,
}

impl FromStr for DeploymentMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("invalid deployment mode: {other}")),
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

#[derive(Clone)]
pub struct AuthConfig {
    jwt_secret: SecretString,
    refresh_secret: SecretString,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
    deployment_mode: DeploymentMode,
    client_url_local: String,
    client_url_prod: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(
        jwt_secret: SecretString,
        refresh_secret: SecretString,
        client_url_prod: String,
    ) -> Self {
        Self {
            jwt_secret,
            refresh_secret,
            access_token_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            refresh_token_ttl: DEFAULT_REFRESH_TOKEN_TTL,
            deployment_mode: DeploymentMode::Production,
            client_url_local: DEFAULT_CLIENT_URL_LOCAL.to_string(),
            client_url_prod,
        }
    }

    #[must_use]
    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_deployment_mode(mut self, mode: DeploymentMode) -> Self {
        self.deployment_mode = mode;
        self
    }

    #[must_use]
    pub fn with_client_url_local(mut self, url: String) -> Self {
        self.client_url_local = url;
        self
    }

    /// Reject configurations that would weaken the token model.
    ///
    /// # Errors
    /// Returns an error for empty or shared secrets, zero lifetimes, or an
    /// unparseable frontend URL.
    pub fn validate(&self) -> Result<()> {
        let jwt_secret = self.jwt_secret.expose_secret();
        let refresh_secret = self.refresh_secret.expose_secret();
        if jwt_secret.is_empty() || refresh_secret.is_empty() {
            bail!("JWT and refresh secrets must not be empty");
        }
        if jwt_secret == refresh_secret {
            bail!("Refresh secret must differ from the JWT secret");
        }
        if self.access_token_ttl.is_zero() || self.refresh_token_ttl.is_zero() {
            bail!("Token lifetimes must be greater than zero");
        }
        self.cookie_domain()?;
        Ok(())
    }

    pub(crate) fn jwt_secret(&self) -> &SecretString {
        &self.jwt_secret
    }

    pub(crate) fn refresh_secret(&self) -> &SecretString {
        &self.refresh_secret
    }

    #[must_use]
    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    #[must_use]
    pub fn refresh_token_ttl(&self) -> Duration {
        self.refresh_token_ttl
    }

    #[must_use]
    pub fn deployment_mode(&self) -> DeploymentMode {
        self.deployment_mode
    }

    /// Frontend origin for the current deployment mode.
    #[must_use]
    pub fn frontend_url(&self) -> &str {
        match self.deployment_mode {
            DeploymentMode::Development => &self.client_url_local,
            DeploymentMode::Production => &self.client_url_prod,
        }
    }

    /// Cookies are only marked `Secure` outside development.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.deployment_mode == DeploymentMode::Production
    }

    /// Host of the frontend origin, used as the cookie `Domain`.
    ///
    /// # Errors
    /// Returns an error if the frontend URL has no host.
    pub fn cookie_domain(&self) -> Result<String> {
        let url = self.frontend_url();
        let parsed = Url::parse(url).map_err(|err| anyhow!("Invalid frontend URL {url}: {err}"))?;
        parsed
            .host_str()
            .map(ToString::to_string)
            .ok_or_else(|| anyhow!("Frontend URL must include a host: {url}"))
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"***")
            .field("refresh_secret", &"***")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("deployment_mode", &self.deployment_mode)
            .field("client_url_local", &self.client_url_local)
            .field("client_url_prod", &self.client_url_prod)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::new(
            SecretString::from("access-secret".to_string()),
            SecretString::from("refresh-secret".to_string()),
            "https://shop.example.com".to_string(),
        )
    }

    #[test]
    fn defaults_and_overrides() {
        let config = config();
        assert_eq!(config.access_token_ttl(), Duration::from_secs(3600));
        assert_eq!(config.refresh_token_ttl().as_millis(), 1_209_600_000);
        assert_eq!(config.deployment_mode(), DeploymentMode::Production);
        assert!(config.cookie_secure());
        assert_eq!(config.frontend_url(), "https://shop.example.com");

        let config = config
            .with_deployment_mode(DeploymentMode::Development)
            .with_client_url_local("http://localhost:5173".to_string())
            .with_access_token_ttl(Duration::from_secs(60));
        assert!(!config.cookie_secure());
        assert_eq!(config.frontend_url(), "http://localhost:5173");
        assert_eq!(config.cookie_domain().ok().as_deref(), Some("localhost"));
        assert_eq!(config.access_token_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn validate_rejects_shared_or_empty_secrets() {
        assert!(config().validate().is_ok());

        let shared = AuthConfig::new(
            SecretString::from("same".to_string()),
            SecretString::from("same".to_string()),
            "https://shop.example.com".to_string(),
        );
        assert!(shared.validate().is_err());

        let empty = AuthConfig::new(
            SecretString::from("".to_string()),
            SecretString::from("refresh".to_string()),
            "https://shop.example.com".to_string(),
        );
        assert!(empty.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_ttl_and_hostless_url() {
        assert!(config().with_refresh_token_ttl(Duration::ZERO).validate().is_err());

        let hostless = AuthConfig::new(
            SecretString::from("a".to_string()),
            SecretString::from("b".to_string()),
            "not a url".to_string(),
        );
        assert!(hostless.validate().is_err());
    }

    #[test]
    fn deployment_mode_parses_aliases() {
        assert_eq!("dev".parse::<DeploymentMode>(), Ok(DeploymentMode::Development));
        assert_eq!("Production".parse::<DeploymentMode>(), Ok(DeploymentMode::Production));
        assert!("staging".parse::<DeploymentMode>().is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("access-secret"));
        assert!(rendered.contains("***"));
    }
}
