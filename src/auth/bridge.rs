//! Delegated (third-party) identity resolution.
//!
//! The provider exchange itself lives elsewhere; this module only defines the
//! `{user, error}` contract and folds every failure into `AuthError::Application`.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{
    error::AuthError,
    model::{Provider, UserRecord},
};
use crate::APP_USER_AGENT;

pub const NOT_CONFIGURED: &str = "Identity provider exchange is not configured";
const NO_USER: &str = "Provider did not return a user";
const EXCHANGE_FAILED: &str = "Identity provider exchange failed";

/// Query parameters of the provider callback, forwarded untouched.
pub type CallbackQuery = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// Result of a provider exchange: a user, an error message, or neither.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub user: Option<UserRecord>,
    pub error: Option<String>,
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn connect(
        &self,
        provider: &Provider,
        query: &CallbackQuery,
    ) -> Result<ResolvedIdentity, ProviderError>;
}

#[derive(Clone)]
pub struct ExternalIdentityBridge {
    resolver: Arc<dyn IdentityResolver>,
}

impl ExternalIdentityBridge {
    #[must_use]
    pub fn new(resolver: Arc<dyn IdentityResolver>) -> Self {
        Self { resolver }
    }

    /// Bridge that rejects every delegated login.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self::new(Arc::new(UnconfiguredResolver))
    }

    /// Resolve the local user behind a provider callback.
    ///
    /// # Errors
    /// `AuthError::Application` carrying the provider's message when it rejects the
    /// exchange or yields no user. Transport failures get a fixed message.
    pub async fn resolve(
        &self,
        provider: &Provider,
        query: &CallbackQuery,
    ) -> Result<UserRecord, AuthError> {
        let resolved = self.resolver.connect(provider, query).await.map_err(|err| {
            warn!(provider = %provider, "Identity exchange failed: {err:#}");
            match err {
                ProviderError::Rejected(message) => AuthError::Application(message),
                ProviderError::Transport(_) => AuthError::Application(EXCHANGE_FAILED.to_string()),
            }
        })?;

        match resolved {
            ResolvedIdentity {
                user: Some(user), ..
            } => Ok(user),
            ResolvedIdentity { error, .. } => Err(AuthError::Application(
                error.unwrap_or_else(|| NO_USER.to_string()),
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct UnconfiguredResolver;

#[async_trait]
impl IdentityResolver for UnconfiguredResolver {
    async fn connect(
        &self,
        _provider: &Provider,
        _query: &CallbackQuery,
    ) -> Result<ResolvedIdentity, ProviderError> {
        Err(ProviderError::Rejected(NOT_CONFIGURED.to_string()))
    }
}

#[derive(Deserialize)]
struct ConnectResponse {
    user: Option<UserRecord>,
    error: Option<ConnectError>,
}

#[derive(Deserialize)]
struct ConnectError {
    message: String,
}

/// Forwards callbacks to `{base}/connect/{provider}` on an identity service.
#[derive(Clone, Debug)]
pub struct HttpIdentityResolver {
    client: Client,
    base_url: Url,
}

impl HttpIdentityResolver {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: Url) -> anyhow::Result<Self> {
        let client = Client::builder().user_agent(APP_USER_AGENT).build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, provider: &Provider) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("identity bridge URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(["connect", provider.name()]);
        Ok(url)
    }
}

#[async_trait]
impl IdentityResolver for HttpIdentityResolver {
    #[instrument(skip(self, provider, query), fields(provider = %provider))]
    async fn connect(
        &self,
        provider: &Provider,
        query: &CallbackQuery,
    ) -> Result<ResolvedIdentity, ProviderError> {
        let url = self.endpoint(provider)?;
        let response = self
            .client
            .get(url.clone())
            .query(query)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        let body: ConnectResponse = response
            .json()
            .await
            .with_context(|| format!("{url} - {status}: invalid response body"))?;
        debug!(%status, "Identity bridge responded");

        if let Some(error) = body.error {
            return Err(ProviderError::Rejected(error.message));
        }
        if !status.is_success() {
            warn!(%url, %status, "Identity bridge returned an error status");
            return Err(ProviderError::Rejected(format!(
                "Identity provider responded with {status}"
            )));
        }
        Ok(ResolvedIdentity {
            user: body.user,
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    struct Fixed(Result<ResolvedIdentity, String>);

    #[async_trait]
    impl IdentityResolver for Fixed {
        async fn connect(
            &self,
            _provider: &Provider,
            _query: &CallbackQuery,
        ) -> Result<ResolvedIdentity, ProviderError> {
            self.0.clone().map_err(ProviderError::Rejected)
        }
    }

    fn github_user() -> UserRecord {
        UserRecord {
            id: 3,
            email: "gh@b.com".to_string(),
            username: "octo".to_string(),
            password_hash: None,
            provider: Provider::from_name("github"),
            confirmed: true,
            blocked: false,
            role_id: Some(1),
        }
    }

    #[tokio::test]
    async fn resolved_user_is_returned() -> Result<()> {
        let bridge = ExternalIdentityBridge::new(Arc::new(Fixed(Ok(ResolvedIdentity {
            user: Some(github_user()),
            error: None,
        }))));
        let user = bridge
            .resolve(&Provider::from_name("github"), &CallbackQuery::new())
            .await?;
        assert_eq!(user.id, 3);
        Ok(())
    }

    #[tokio::test]
    async fn provider_error_becomes_application_error() {
        let bridge =
            ExternalIdentityBridge::new(Arc::new(Fixed(Err("Bad verification code".to_string()))));
        let result = bridge
            .resolve(&Provider::from_name("github"), &CallbackQuery::new())
            .await;
        assert!(
            matches!(result, Err(AuthError::Application(ref msg)) if msg == "Bad verification code")
        );
    }

    struct Unreachable;

    #[async_trait]
    impl IdentityResolver for Unreachable {
        async fn connect(
            &self,
            _provider: &Provider,
            _query: &CallbackQuery,
        ) -> Result<ResolvedIdentity, ProviderError> {
            Err(ProviderError::Transport(anyhow!(
                "request to http://bridge.internal:8081/connect/github failed"
            )))
        }
    }

    #[tokio::test]
    async fn transport_failure_hides_bridge_address() {
        let result = ExternalIdentityBridge::new(Arc::new(Unreachable))
            .resolve(&Provider::from_name("github"), &CallbackQuery::new())
            .await;
        assert!(matches!(
            result,
            Err(AuthError::Application(ref msg))
                if msg == EXCHANGE_FAILED && !msg.contains("bridge.internal")
        ));
    }

    #[tokio::test]
    async fn missing_user_uses_reported_error() {
        let bridge = ExternalIdentityBridge::new(Arc::new(Fixed(Ok(ResolvedIdentity {
            user: None,
            error: Some("Email was not available.".to_string()),
        }))));
        let result = bridge
            .resolve(&Provider::from_name("google"), &CallbackQuery::new())
            .await;
        assert!(
            matches!(result, Err(AuthError::Application(ref msg)) if msg == "Email was not available.")
        );

        let bridge = ExternalIdentityBridge::new(Arc::new(Fixed(Ok(ResolvedIdentity::default()))));
        let result = bridge
            .resolve(&Provider::from_name("google"), &CallbackQuery::new())
            .await;
        assert!(matches!(result, Err(AuthError::Application(ref msg)) if msg == NO_USER));
    }

    #[tokio::test]
    async fn unconfigured_bridge_rejects() {
        let result = ExternalIdentityBridge::unconfigured()
            .resolve(&Provider::from_name("github"), &CallbackQuery::new())
            .await;
        assert!(matches!(result, Err(AuthError::Application(ref msg)) if msg == NOT_CONFIGURED));
    }

    #[test]
    fn endpoint_appends_provider_segment() -> Result<()> {
        let resolver = HttpIdentityResolver::new(Url::parse("http://bridge.internal:8080/api/")?)?;
        let url = resolver.endpoint(&Provider::from_name("GitHub"))?;
        assert_eq!(url.as_str(), "http://bridge.internal:8080/api/connect/github");

        let resolver = HttpIdentityResolver::new(Url::parse("http://bridge.internal")?)?;
        let url = resolver.endpoint(&Provider::from_name("google"))?;
        assert_eq!(url.as_str(), "http://bridge.internal/connect/google");
        Ok(())
    }
}
