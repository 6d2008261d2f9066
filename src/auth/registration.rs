//! Local account sign-up.

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use super::{
    error::AuthError,
    gate::AccountGate,
    mailer::ConfirmationSender,
    model::{AuthSettings, NewUser, Provider, SanitizedUser},
    password::CredentialVerifier,
    session::{Session, TokenIssuer},
    store::{IdentifierFilter, StoreError, UserStore},
    validation::{strip_server_fields, validate_registration},
};

/// Body returned while the account waits for email confirmation.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PendingBody {
    pub user: SanitizedUser,
}

#[derive(Clone, Debug)]
pub enum RegistrationOutcome {
    /// Confirmation email requested, no tokens issued.
    Pending(PendingBody),
    /// Account usable immediately.
    Active(Session),
}

pub struct RegistrationService {
    users: Arc<dyn UserStore>,
    sender: Arc<dyn ConfirmationSender>,
    tokens: TokenIssuer,
    verifier: CredentialVerifier,
    gate: AccountGate,
}

impl RegistrationService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        sender: Arc<dyn ConfirmationSender>,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            users,
            sender,
            tokens,
            verifier: CredentialVerifier::new(),
            gate: AccountGate,
        }
    }

    /// Create a local account from a raw request body.
    ///
    /// # Errors
    /// `RegistrationDisabled`, `ValidationError`, `RoleNotFound`, `IdentifierTaken`,
    /// `ApplicationError` when the confirmation email cannot be requested, or
    /// `Internal` on store failure.
    #[instrument(skip_all)]
    pub async fn register(
        &self,
        raw: Map<String, Value>,
        settings: &AuthSettings,
    ) -> Result<RegistrationOutcome, AuthError> {
        self.gate.check_registration_open(settings)?;

        let body = strip_server_fields(raw);
        let provider = Provider::Local;
        let input = validate_registration(&body)?;

        let role = self
            .users
            .find_role_by_type(&settings.default_role_type)
            .await?
            .ok_or(AuthError::RoleNotFound)?;

        let filter = IdentifierFilter::new(&input.email, &input.username);
        self.gate
            .check_register_eligible(self.users.as_ref(), &filter, &provider, settings)
            .await?;

        let password_hash = self.verifier.hash_blocking(&input.password).await?;
        let new_user = NewUser {
            email: input.email.to_lowercase(),
            username: input.username,
            password_hash: Some(password_hash),
            provider,
            confirmed: !settings.email_confirmation_required,
            blocked: false,
            role_id: role.id,
        };

        let user = match self.users.create(new_user).await {
            Ok(user) => user,
            Err(StoreError::Conflict) => {
                warn!("Registration lost a uniqueness race");
                return Err(AuthError::IdentifierTaken);
            }
            Err(err) => return Err(err.into()),
        };
        info!(user_id = user.id, "User registered");

        if settings.email_confirmation_required {
            let sanitized = user.sanitize();
            self.sender
                .send_confirmation(&sanitized)
                .await
                .map_err(|err| AuthError::Application(err.to_string()))?;
            return Ok(RegistrationOutcome::Pending(PendingBody { user: sanitized }));
        }

        Ok(RegistrationOutcome::Active(self.tokens.issue_local(&user)?))
    }
}
