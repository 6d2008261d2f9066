//! Shared auth services handed to every handler through `Extension`.

use std::sync::Arc;

use crate::auth::{
    AuthConfig, AuthError, RegistrationService, SessionIssuer, TokenIssuer,
    bridge::ExternalIdentityBridge,
    cookie::CookiePolicy,
    mailer::ConfirmationSender,
    model::AuthSettings,
    store::{SettingsStore, UserStore},
    token::TokenCodec,
};

pub struct AuthState {
    sessions: SessionIssuer,
    registration: RegistrationService,
    settings: Arc<dyn SettingsStore>,
    frontend_url: String,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: &AuthConfig,
        users: Arc<dyn UserStore>,
        settings: Arc<dyn SettingsStore>,
        sender: Arc<dyn ConfirmationSender>,
        bridge: ExternalIdentityBridge,
    ) -> Self {
        let tokens = TokenIssuer::new(
            Arc::new(TokenCodec::new(config)),
            CookiePolicy::from_config(config),
        );
        Self {
            sessions: SessionIssuer::new(users.clone(), tokens.clone(), bridge),
            registration: RegistrationService::new(users, sender, tokens),
            settings,
            frontend_url: config.frontend_url().to_string(),
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    #[must_use]
    pub fn registration(&self) -> &RegistrationService {
        &self.registration
    }

    #[must_use]
    pub fn frontend_url(&self) -> &str {
        &self.frontend_url
    }

    /// Fresh settings snapshot for one request.
    ///
    /// # Errors
    /// `AuthError::Internal` if the settings store is unavailable.
    pub async fn settings(&self) -> Result<AuthSettings, AuthError> {
        Ok(self.settings.load().await?)
    }
}
