//! Login, refresh and logout orchestration.
//!
//! A login request resolves its provider first. `local` goes through
//! credential verification and the account gate and receives an access token,
//! a refresh token and the refresh cookie. Any other provider is delegated to
//! the identity bridge and receives an access token only.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use super::{
    bridge::{CallbackQuery, ExternalIdentityBridge},
    cookie::{CookiePolicy, RefreshCookie},
    error::AuthError,
    gate::AccountGate,
    model::{AuthSettings, Provider, SanitizedUser, UserRecord},
    password::CredentialVerifier,
    store::{Identifier, UserStore},
    token::TokenCodec,
    validation::{LoginRequest, is_email},
};

/// Response body for a successful login or active registration.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionBody {
    pub jwt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub user: SanitizedUser,
}

/// Response body for a successful refresh.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshBody {
    pub jwt: String,
    pub refresh_token: String,
}

/// An issued session: the body to send and, for local flows, the cookie to set.
#[derive(Clone, Debug)]
pub struct Session {
    pub body: SessionBody,
    pub cookie: Option<RefreshCookie>,
}

#[derive(Clone, Debug)]
pub struct Refreshed {
    pub body: RefreshBody,
    pub cookie: RefreshCookie,
}

/// Mints token pairs and the matching refresh cookie.
#[derive(Clone)]
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    cookies: CookiePolicy,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(codec: Arc<TokenCodec>, cookies: CookiePolicy) -> Self {
        Self { codec, cookies }
    }

    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    #[must_use]
    pub fn cookies(&self) -> &CookiePolicy {
        &self.cookies
    }

    /// Access token, refresh token and cookie for a local session.
    ///
    /// # Errors
    /// `AuthError::Internal` if signing fails.
    pub fn issue_local(&self, user: &UserRecord) -> Result<Session, AuthError> {
        let jwt = self.codec.issue_access(user.id, self.codec.access_ttl())?;
        let refresh_token = self.codec.issue_refresh(user.id, self.codec.refresh_ttl())?;
        let cookie = self.cookies.issue(&refresh_token);
        Ok(Session {
            body: SessionBody {
                jwt,
                refresh_token: Some(refresh_token),
                user: user.sanitize(),
            },
            cookie: Some(cookie),
        })
    }

    /// Access token only, for delegated logins.
    ///
    /// # Errors
    /// `AuthError::Internal` if signing fails.
    pub fn issue_delegated(&self, user: &UserRecord) -> Result<Session, AuthError> {
        let jwt = self.codec.issue_access(user.id, self.codec.access_ttl())?;
        Ok(Session {
            body: SessionBody {
                jwt,
                refresh_token: None,
                user: user.sanitize(),
            },
            cookie: None,
        })
    }
}

pub struct SessionIssuer {
    users: Arc<dyn UserStore>,
    tokens: TokenIssuer,
    verifier: CredentialVerifier,
    bridge: ExternalIdentityBridge,
    gate: AccountGate,
}

impl SessionIssuer {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: TokenIssuer,
        bridge: ExternalIdentityBridge,
    ) -> Self {
        Self {
            users,
            tokens,
            verifier: CredentialVerifier::new(),
            bridge,
            gate: AccountGate,
        }
    }

    /// Authenticate through `provider`. `request` is the local credential body,
    /// `query` the delegated callback parameters.
    ///
    /// # Errors
    /// Any login failure kind; see `login_local` and `login_delegated`.
    pub async fn login(
        &self,
        provider: &Provider,
        settings: &AuthSettings,
        request: Option<&LoginRequest>,
        query: &CallbackQuery,
    ) -> Result<Session, AuthError> {
        if provider.is_local() {
            let empty = LoginRequest::default();
            self.login_local(settings, request.unwrap_or(&empty)).await
        } else {
            self.login_delegated(provider, settings, query).await
        }
    }

    /// Local identifier/password login.
    ///
    /// # Errors
    /// `ProviderDisabled`, `ValidationError`, `InvalidCredentials`, `AccountUnconfirmed`,
    /// `AccountBlocked` or `NoLocalPassword`.
    #[instrument(skip_all)]
    pub async fn login_local(
        &self,
        settings: &AuthSettings,
        request: &LoginRequest,
    ) -> Result<Session, AuthError> {
        let provider = Provider::Local;
        self.gate.check_provider_enabled(&provider, settings)?;
        let credentials = request.validate()?;

        let identifier = if is_email(&credentials.identifier) {
            Identifier::Email(credentials.identifier.to_lowercase())
        } else {
            Identifier::Username(credentials.identifier.clone())
        };

        let Some(user) = self.users.find_by_identifier(&provider, &identifier).await? else {
            debug!("Login for unknown identifier");
            return Err(AuthError::InvalidCredentials);
        };

        self.gate.check_login_eligible(&user, &provider, settings)?;

        let stored_hash = user.password_hash.as_deref().unwrap_or_default();
        if !self
            .verifier
            .verify_blocking(&credentials.password, stored_hash)
            .await?
        {
            debug!(user_id = user.id, "Login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = user.id, "Local login succeeded");
        self.tokens.issue_local(&user)
    }

    /// Login through an external provider.
    ///
    /// # Errors
    /// `ProviderDisabled`, `ApplicationError` from the bridge, `AccountUnconfirmed`
    /// or `AccountBlocked`.
    #[instrument(skip(self, settings, query), fields(provider = %provider))]
    pub async fn login_delegated(
        &self,
        provider: &Provider,
        settings: &AuthSettings,
        query: &CallbackQuery,
    ) -> Result<Session, AuthError> {
        self.gate.check_provider_enabled(provider, settings)?;
        let user = self.bridge.resolve(provider, query).await?;
        self.gate.check_account_state(&user, settings)?;

        info!(user_id = user.id, "Delegated login succeeded");
        self.tokens.issue_delegated(&user)
    }

    /// Exchange a refresh token for a new access token and a rotated refresh token.
    /// The cookie value wins over the body value.
    ///
    /// # Errors
    /// `MissingToken`, `InvalidToken`, `InvalidCredentials` if the user is gone,
    /// `AccountUnconfirmed` or `AccountBlocked`.
    #[instrument(skip_all)]
    pub async fn refresh(
        &self,
        settings: &AuthSettings,
        cookie_token: Option<&str>,
        body_token: Option<&str>,
    ) -> Result<Refreshed, AuthError> {
        let token = cookie_token
            .filter(|token| !token.is_empty())
            .or_else(|| body_token.filter(|token| !token.is_empty()))
            .ok_or(AuthError::MissingToken)?;

        let user_id = self.tokens.codec().verify_refresh(token)?;
        let Some(user) = self.users.find_by_id(user_id).await? else {
            debug!(user_id, "Refresh for a user that no longer exists");
            return Err(AuthError::InvalidCredentials);
        };
        self.gate.check_account_state(&user, settings)?;

        let session = self.tokens.issue_local(&user)?;
        let (Some(refresh_token), Some(cookie)) = (session.body.refresh_token, session.cookie)
        else {
            return Err(AuthError::Internal(anyhow::anyhow!(
                "local session issued without a refresh token"
            )));
        };

        debug!(user_id, "Refresh token rotated");
        Ok(Refreshed {
            body: RefreshBody {
                jwt: session.body.jwt,
                refresh_token,
            },
            cookie,
        })
    }

    /// Cookie that removes the refresh token; logout cannot fail.
    #[must_use]
    pub fn logout(&self) -> RefreshCookie {
        self.tokens.cookies().clear()
    }

    /// Resolve the user behind an access token.
    ///
    /// # Errors
    /// `InvalidToken` when the token does not verify, the user is gone or the
    /// account fails the state checks.
    pub async fn authenticate(
        &self,
        settings: &AuthSettings,
        access_token: &str,
    ) -> Result<SanitizedUser, AuthError> {
        let user_id = self.tokens.codec().verify_access(access_token)?;
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        self.gate.check_account_state(&user, settings)?;
        Ok(user.sanitize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{
            bridge::{IdentityResolver, ProviderError, ResolvedIdentity},
            config::AuthConfig,
        },
        storage::memory::MemoryUserStore,
    };
    use anyhow::Result;
    use async_trait::async_trait;
    use secrecy::SecretString;
    use std::time::Duration;

    fn config() -> AuthConfig {
        AuthConfig::new(
            SecretString::from("access-secret".to_string()),
            SecretString::from("refresh-secret".to_string()),
            "https://shop.example.com".to_string(),
        )
    }

    fn tokens(config: &AuthConfig) -> TokenIssuer {
        TokenIssuer::new(
            Arc::new(TokenCodec::new(config)),
            CookiePolicy::from_config(config),
        )
    }

    async fn seeded_store(password: &str) -> Result<Arc<MemoryUserStore>> {
        let store = Arc::new(MemoryUserStore::new());
        let hash = CredentialVerifier::new().hash(password)?;
        store
            .insert(UserRecord {
                id: 7,
                email: "a@b.com".to_string(),
                username: "alice".to_string(),
                password_hash: Some(hash),
                provider: Provider::Local,
                confirmed: true,
                blocked: false,
                role_id: Some(1),
            })
            .await;
        Ok(store)
    }

    fn issuer(store: Arc<MemoryUserStore>) -> SessionIssuer {
        SessionIssuer::new(store, tokens(&config()), ExternalIdentityBridge::unconfigured())
    }

    fn credentials(identifier: &str, password: &str) -> LoginRequest {
        LoginRequest {
            identifier: Some(identifier.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn local_login_issues_pair_and_cookie() -> Result<()> {
        let issuer = issuer(seeded_store("correct").await?);
        let settings = AuthSettings::default();
        let session = issuer
            .login_local(&settings, &credentials("A@B.com", "correct"))
            .await?;

        assert_eq!(session.body.user.id, 7);
        let refresh = session.body.refresh_token.clone().unwrap_or_default();
        let cookie = session.cookie.clone().map(|c| (c.value, c.http_only, c.max_age));
        assert_eq!(
            cookie,
            Some((refresh.clone(), true, Duration::from_secs(1_209_600)))
        );
        assert_eq!(issuer.tokens.codec().verify_access(&session.body.jwt)?, 7);
        assert_eq!(issuer.tokens.codec().verify_refresh(&refresh)?, 7);

        // Username lookup works as well.
        issuer.login_local(&settings, &credentials("alice", "correct")).await?;
        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() -> Result<()> {
        let issuer = issuer(seeded_store("correct").await?);
        let settings = AuthSettings::default();
        let wrong = issuer
            .login_local(&settings, &credentials("a@b.com", "nope"))
            .await
            .map(|_| ())
            .map_err(|err| err.to_string());
        let unknown = issuer
            .login_local(&settings, &credentials("ghost@b.com", "nope"))
            .await
            .map(|_| ())
            .map_err(|err| err.to_string());
        assert_eq!(wrong, unknown);
        assert_eq!(wrong, Err("Invalid identifier or password".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn blocked_user_cannot_refresh_with_valid_token() -> Result<()> {
        let store = seeded_store("correct").await?;
        let issuer = issuer(store.clone());
        let settings = AuthSettings::default();
        let session = issuer
            .login_local(&settings, &credentials("a@b.com", "correct"))
            .await?;
        let refresh = session.body.refresh_token.unwrap_or_default();

        store.update(7, |user| user.blocked = true).await;
        let result = issuer.refresh(&settings, Some(&refresh), None).await;
        assert!(matches!(result, Err(AuthError::AccountBlocked)));
        Ok(())
    }

    #[tokio::test]
    async fn refresh_prefers_cookie_and_requires_a_token() -> Result<()> {
        let issuer = issuer(seeded_store("correct").await?);
        let settings = AuthSettings::default();
        let session = issuer
            .login_local(&settings, &credentials("a@b.com", "correct"))
            .await?;
        let refresh = session.body.refresh_token.unwrap_or_default();

        let refreshed = issuer
            .refresh(&settings, Some(&refresh), Some("garbage"))
            .await?;
        assert_eq!(issuer.tokens.codec().verify_access(&refreshed.body.jwt)?, 7);
        assert_eq!(refreshed.cookie.value, refreshed.body.refresh_token);

        let body_only = issuer.refresh(&settings, None, Some(&refresh)).await;
        assert!(body_only.is_ok());

        let missing = issuer.refresh(&settings, None, None).await;
        assert!(matches!(missing, Err(AuthError::MissingToken)));

        let tampered = format!("{refresh}x");
        let result = issuer.refresh(&settings, Some(&tampered), None).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
        Ok(())
    }

    #[tokio::test]
    async fn refresh_for_deleted_user_is_rejected() -> Result<()> {
        let store = seeded_store("correct").await?;
        let issuer = issuer(store.clone());
        let refresh = issuer.tokens.codec().issue_refresh(7, Duration::from_secs(60))?;
        store.remove(7).await;
        let result = issuer
            .refresh(&AuthSettings::default(), Some(&refresh), None)
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        Ok(())
    }

    #[tokio::test]
    async fn local_login_via_callback_without_body_is_a_validation_error() -> Result<()> {
        let issuer = issuer(seeded_store("correct").await?);
        let result = issuer
            .login(
                &Provider::Local,
                &AuthSettings::default(),
                None,
                &CallbackQuery::new(),
            )
            .await;
        assert!(
            matches!(result, Err(AuthError::Validation(ref msg)) if msg == "identifier is a required field")
        );
        Ok(())
    }

    struct GithubResolver(UserRecord);

    #[async_trait]
    impl IdentityResolver for GithubResolver {
        async fn connect(
            &self,
            _provider: &Provider,
            _query: &CallbackQuery,
        ) -> Result<ResolvedIdentity, ProviderError> {
            Ok(ResolvedIdentity {
                user: Some(self.0.clone()),
                error: None,
            })
        }
    }

    #[tokio::test]
    async fn delegated_login_gets_access_token_only() -> Result<()> {
        let github_user = UserRecord {
            id: 9,
            email: "gh@b.com".to_string(),
            username: "octo".to_string(),
            password_hash: None,
            provider: Provider::from_name("github"),
            confirmed: true,
            blocked: false,
            role_id: Some(1),
        };
        let issuer = SessionIssuer::new(
            Arc::new(MemoryUserStore::new()),
            tokens(&config()),
            ExternalIdentityBridge::new(Arc::new(GithubResolver(github_user))),
        );
        let github = Provider::from_name("github");

        let disabled = issuer
            .login(&github, &AuthSettings::default(), None, &CallbackQuery::new())
            .await;
        assert!(matches!(disabled, Err(AuthError::ProviderDisabled)));

        let settings = AuthSettings::default().with_provider("github", true);
        let session = issuer
            .login(&github, &settings, None, &CallbackQuery::new())
            .await?;
        assert_eq!(session.body.user.id, 9);
        assert!(session.body.refresh_token.is_none());
        assert!(session.cookie.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn logout_clears_cookie() -> Result<()> {
        let issuer = issuer(seeded_store("correct").await?);
        let cookie = issuer.logout();
        assert!(cookie.is_removal());
        Ok(())
    }

    #[tokio::test]
    async fn authenticate_resolves_access_token_owner() -> Result<()> {
        let issuer = issuer(seeded_store("correct").await?);
        let settings = AuthSettings::default();
        let jwt = issuer.tokens.codec().issue_access(7, Duration::from_secs(60))?;
        assert_eq!(issuer.authenticate(&settings, &jwt).await?.username, "alice");

        let refresh = issuer.tokens.codec().issue_refresh(7, Duration::from_secs(60))?;
        let result = issuer.authenticate(&settings, &refresh).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
        Ok(())
    }
}
