//! User records, settings snapshots and the client-facing user projection.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::BTreeMap, fmt};
use utoipa::ToSchema;

pub type UserId = i64;

pub const LOCAL_PROVIDER: &str = "local";

/// Authentication method a record belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Provider {
    Local,
    External(String),
}

impl Provider {
    /// Parse a provider name as it appears in a route or a stored record.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        if name.eq_ignore_ascii_case(LOCAL_PROVIDER) {
            Self::Local
        } else {
            Self::External(name.to_lowercase())
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Local => LOCAL_PROVIDER,
            Self::External(name) => name,
        }
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Provider {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Provider {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

/// A stored user as seen by the auth core. Only held for the span of a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub username: String,
    /// `None` for accounts created through an external provider.
    #[serde(default)]
    pub password_hash: Option<String>,
    pub provider: Provider,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub role_id: Option<i64>,
}

impl UserRecord {
    #[must_use]
    pub fn sanitize(&self) -> SanitizedUser {
        SanitizedUser::from(self)
    }
}

/// Fields needed to create a user; the id is assigned by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: Option<String>,
    pub provider: Provider,
    pub confirmed: bool,
    pub blocked: bool,
    pub role_id: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub role_type: String,
}

/// The only user representation ever sent to a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SanitizedUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[schema(value_type = String, example = "local")]
    pub provider: Provider,
    pub confirmed: bool,
    pub blocked: bool,
}

impl From<&UserRecord> for SanitizedUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            provider: user.provider.clone(),
            confirmed: user.confirmed,
            blocked: user.blocked,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub enabled: bool,
}

/// Read-only per-request snapshot of the auth settings store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSettings {
    pub allow_register: bool,
    pub unique_email: bool,
    pub email_confirmation_required: bool,
    pub default_role_type: String,
    pub providers: BTreeMap<String, ProviderSettings>,
}

impl AuthSettings {
    #[must_use]
    pub fn provider_enabled(&self, provider: &Provider) -> bool {
        self.providers
            .get(provider.name())
            .is_some_and(|settings| settings.enabled)
    }

    #[must_use]
    pub fn with_provider(mut self, name: &str, enabled: bool) -> Self {
        self.providers
            .insert(Provider::from_name(name).name().to_string(), ProviderSettings { enabled });
        self
    }
}

impl Default for AuthSettings {
    /// Registration open, one account per email, no confirmation, local login enabled.
    fn default() -> Self {
        Self {
            allow_register: true,
            unique_email: true,
            email_confirmation_required: false,
            default_role_type: "authenticated".to_string(),
            providers: BTreeMap::new(),
        }
        .with_provider(LOCAL_PROVIDER, true)
    }
}
