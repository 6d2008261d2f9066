//! In-process stores for tests and local development.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::auth::{
    model::{AuthSettings, NewUser, Provider, Role, UserId, UserRecord},
    store::{Identifier, IdentifierFilter, SettingsStore, StoreError, UserStore},
};

struct Inner {
    users: Vec<UserRecord>,
    roles: Vec<Role>,
    next_id: UserId,
}

/// Vec-backed user store enforcing the same `(provider, email)` and
/// `(provider, username)` uniqueness as the Postgres schema.
pub struct MemoryUserStore {
    inner: RwLock<Inner>,
}

impl MemoryUserStore {
    /// Store seeded with the `authenticated` and `public` roles.
    #[must_use]
    pub fn new() -> Self {
        Self::with_roles(vec![
            Role {
                id: 1,
                name: "Authenticated".to_string(),
                role_type: "authenticated".to_string(),
            },
            Role {
                id: 2,
                name: "Public".to_string(),
                role_type: "public".to_string(),
            },
        ])
    }

    #[must_use]
    pub fn with_roles(roles: Vec<Role>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                users: Vec::new(),
                roles,
                next_id: 1,
            }),
        }
    }

    /// Insert or replace a record as-is, keeping its id.
    pub async fn insert(&self, user: UserRecord) {
        let mut inner = self.inner.write().await;
        inner.next_id = inner.next_id.max(user.id + 1);
        inner.users.retain(|existing| existing.id != user.id);
        inner.users.push(user);
    }

    /// Apply `change` to the record with `id`; returns whether it existed.
    pub async fn update<F>(&self, id: UserId, change: F) -> bool
    where
        F: FnOnce(&mut UserRecord),
    {
        let mut inner = self.inner.write().await;
        match inner.users.iter_mut().find(|user| user.id == id) {
            Some(user) => {
                change(user);
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, id: UserId) {
        self.inner.write().await.users.retain(|user| user.id != id);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_by_identifier(
        &self,
        provider: &Provider,
        identifier: &Identifier,
    ) -> Result<Option<UserRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|user| {
                &user.provider == provider
                    && match identifier {
                        Identifier::Email(email) => user.email.to_lowercase() == *email,
                        Identifier::Username(username) => user.username == *username,
                    }
            })
            .cloned())
    }

    async fn count_conflicts(
        &self,
        filter: &IdentifierFilter,
        provider: Option<&Provider>,
    ) -> Result<u64, StoreError> {
        let inner = self.inner.read().await;
        let count = inner
            .users
            .iter()
            .filter(|user| provider.map_or(true, |provider| &user.provider == provider))
            .filter(|user| filter.matches(user))
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn find_role_by_type(&self, role_type: &str) -> Result<Option<Role>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .roles
            .iter()
            .find(|role| role.role_type == role_type)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut inner = self.inner.write().await;
        let duplicate = inner.users.iter().any(|existing| {
            existing.provider == user.provider
                && (existing.email.to_lowercase() == user.email.to_lowercase()
                    || existing.username == user.username)
        });
        if duplicate {
            return Err(StoreError::Conflict);
        }

        let record = UserRecord {
            id: inner.next_id,
            email: user.email,
            username: user.username,
            password_hash: user.password_hash,
            provider: user.provider,
            confirmed: user.confirmed,
            blocked: user.blocked,
            role_id: Some(user.role_id),
        };
        inner.next_id += 1;
        inner.users.push(record.clone());
        Ok(record)
    }
}

/// Fixed settings snapshot, returned as-is on every load.
#[derive(Clone, Debug, Default)]
pub struct StaticSettings {
    settings: AuthSettings,
}

impl StaticSettings {
    #[must_use]
    pub fn new(settings: AuthSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SettingsStore for StaticSettings {
    async fn load(&self) -> Result<AuthSettings, StoreError> {
        Ok(self.settings.clone())
    }
}
