//! Account-state preconditions for login, refresh and registration.

use super::{
    error::AuthError,
    model::{AuthSettings, Provider, UserRecord},
    store::{IdentifierFilter, UserStore},
};

#[derive(Clone, Copy, Debug, Default)]
pub struct AccountGate;

impl AccountGate {
    /// # Errors
    /// `ProviderDisabled` when `provider` is not enabled in `settings`.
    pub fn check_provider_enabled(
        self,
        provider: &Provider,
        settings: &AuthSettings,
    ) -> Result<(), AuthError> {
        if settings.provider_enabled(provider) {
            Ok(())
        } else {
            Err(AuthError::ProviderDisabled)
        }
    }

    /// Confirmation and block checks shared by login and refresh.
    ///
    /// # Errors
    /// `AccountUnconfirmed` or `AccountBlocked`, in that order.
    pub fn check_account_state(
        self,
        user: &UserRecord,
        settings: &AuthSettings,
    ) -> Result<(), AuthError> {
        if settings.email_confirmation_required && !user.confirmed {
            return Err(AuthError::AccountUnconfirmed);
        }
        if user.blocked {
            return Err(AuthError::AccountBlocked);
        }
        Ok(())
    }

    /// Full login gate, evaluated in order: provider, confirmation, block, local password.
    ///
    /// # Errors
    /// `ProviderDisabled`, `AccountUnconfirmed`, `AccountBlocked` or `NoLocalPassword`.
    pub fn check_login_eligible(
        self,
        user: &UserRecord,
        provider: &Provider,
        settings: &AuthSettings,
    ) -> Result<(), AuthError> {
        self.check_provider_enabled(provider, settings)?;
        self.check_account_state(user, settings)?;
        if provider.is_local() && user.password_hash.as_deref().map_or(true, str::is_empty) {
            return Err(AuthError::NoLocalPassword);
        }
        Ok(())
    }

    /// # Errors
    /// `RegistrationDisabled` when sign-ups are turned off.
    pub fn check_registration_open(self, settings: &AuthSettings) -> Result<(), AuthError> {
        if settings.allow_register {
            Ok(())
        } else {
            Err(AuthError::RegistrationDisabled)
        }
    }

    /// Registration must be open and the identifiers unused, under `provider` and,
    /// with `unique_email`, under any provider.
    ///
    /// The counts are read once here; a concurrent sign-up can still win the race
    /// and is caught as a store conflict on insert.
    ///
    /// # Errors
    /// `RegistrationDisabled`, `IdentifierTaken`, or `Internal` on store failure.
    pub async fn check_register_eligible(
        self,
        store: &dyn UserStore,
        filter: &IdentifierFilter,
        provider: &Provider,
        settings: &AuthSettings,
    ) -> Result<(), AuthError> {
        self.check_registration_open(settings)?;

        let conflicts = store.count_conflicts(filter, Some(provider)).await?;
        if conflicts > 0 {
            return Err(AuthError::IdentifierTaken);
        }

        if settings.unique_email {
            let conflicts = store.count_conflicts(filter, None).await?;
            if conflicts > 0 {
                return Err(AuthError::IdentifierTaken);
            }
        }

        Ok(())
    }
}
