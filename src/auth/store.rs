//! Storage capabilities the auth core depends on.

use async_trait::async_trait;
use thiserror::Error;

use super::model::{AuthSettings, NewUser, Provider, Role, UserId, UserRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("record conflicts with an existing record")]
    Conflict,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// How a login identifier is matched against stored users.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identifier {
    /// Already lower-cased.
    Email(String),
    Username(String),
}

/// Identifiers that collide with a registration: `email` or `username` appearing
/// in either column, with the email side folded to lower case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentifierFilter {
    pub email: String,
    pub username: String,
}

impl IdentifierFilter {
    #[must_use]
    pub fn new(email: &str, username: &str) -> Self {
        Self {
            email: email.to_lowercase(),
            username: username.to_string(),
        }
    }

    /// Whether `user` collides with this filter, ignoring provider.
    #[must_use]
    pub fn matches(&self, user: &UserRecord) -> bool {
        user.email == self.email
            || user.username == self.email
            || user.username == self.username
            || user.email == self.username
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_identifier(
        &self,
        provider: &Provider,
        identifier: &Identifier,
    ) -> Result<Option<UserRecord>, StoreError>;

    /// Count users colliding with `filter`; `None` counts across all providers.
    async fn count_conflicts(
        &self,
        filter: &IdentifierFilter,
        provider: Option<&Provider>,
    ) -> Result<u64, StoreError>;

    async fn find_role_by_type(&self, role_type: &str) -> Result<Option<Role>, StoreError>;

    /// Persist a new user. Unique-constraint failures surface as `StoreError::Conflict`.
    async fn create(&self, user: NewUser) -> Result<UserRecord, StoreError>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<AuthSettings, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str, username: &str) -> UserRecord {
        UserRecord {
            id: 1,
            email: email.to_string(),
            username: username.to_string(),
            password_hash: None,
            provider: Provider::Local,
            confirmed: true,
            blocked: false,
            role_id: None,
        }
    }

    #[test]
    fn filter_folds_email_case() {
        let filter = IdentifierFilter::new("Alice@Example.com", "alice");
        assert_eq!(filter.email, "alice@example.com");
        assert!(filter.matches(&user("alice@example.com", "someone")));
    }

    #[test]
    fn filter_matches_crossed_columns() {
        let filter = IdentifierFilter::new("a@b.com", "alice");
        assert!(filter.matches(&user("other@b.com", "alice")));
        assert!(filter.matches(&user("other@b.com", "a@b.com")));
        assert!(filter.matches(&user("alice", "bob")));
        assert!(!filter.matches(&user("other@b.com", "bob")));
    }
}
