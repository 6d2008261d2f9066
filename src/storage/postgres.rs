//! Postgres-backed stores. Schema lives in `sql/schema.sql`.

use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::collections::BTreeMap;
use tracing::{Instrument, debug, info_span, warn};

use crate::auth::{
    mailer::ConfirmationSender,
    model::{
        AuthSettings, NewUser, Provider, ProviderSettings, Role, SanitizedUser, UserId, UserRecord,
    },
    store::{Identifier, IdentifierFilter, SettingsStore, StoreError, UserStore},
};

const USER_COLUMNS: &str =
    "id, email, username, password_hash, provider, confirmed, blocked, role_id";

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn user_from_row(row: &PgRow) -> UserRecord {
    let provider: String = row.get("provider");
    UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        provider: Provider::from_name(&provider),
        confirmed: row.get("confirmed"),
        blocked: row.get("blocked"),
        role_id: row.get("role_id"),
    }
}

#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by id")?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_identifier(
        &self,
        provider: &Provider,
        identifier: &Identifier,
    ) -> Result<Option<UserRecord>, StoreError> {
        let (query, value) = match identifier {
            Identifier::Email(email) => (
                format!("SELECT {USER_COLUMNS} FROM users WHERE provider = $1 AND lower(email) = $2"),
                email,
            ),
            Identifier::Username(username) => (
                format!("SELECT {USER_COLUMNS} FROM users WHERE provider = $1 AND username = $2"),
                username,
            ),
        };
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(provider.name())
            .bind(value)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by identifier")?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn count_conflicts(
        &self,
        filter: &IdentifierFilter,
        provider: Option<&Provider>,
    ) -> Result<u64, StoreError> {
        let query = r"
            SELECT COUNT(*) AS conflicts
            FROM users
            WHERE ($3::text IS NULL OR provider = $3)
              AND (lower(email) = $1 OR username = $1 OR username = $2 OR lower(email) = $2)
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(&filter.email)
            .bind(&filter.username)
            .bind(provider.map(Provider::name))
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to count conflicting users")?;

        let conflicts: i64 = row.get("conflicts");
        Ok(u64::try_from(conflicts).unwrap_or_default())
    }

    async fn find_role_by_type(&self, role_type: &str) -> Result<Option<Role>, StoreError> {
        let query = "SELECT id, name, type FROM roles WHERE type = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(role_type)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup role")?;

        Ok(row.map(|row| Role {
            id: row.get("id"),
            name: row.get("name"),
            role_type: row.get("type"),
        }))
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let query = format!(
            r"
            INSERT INTO users
                (email, username, password_hash, provider, confirmed, blocked, role_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
        "
        );
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query.as_str()
        );
        let result = sqlx::query(&query)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.provider.name())
            .bind(user.confirmed)
            .bind(user.blocked)
            .bind(user.role_id)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(row) => Ok(user_from_row(&row)),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(anyhow::Error::new(err)
                .context("failed to insert user")
                .into()),
        }
    }
}

/// Reads the singleton `auth_settings` row and the `auth_providers` table.
#[derive(Clone, Debug)]
pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn load(&self) -> Result<AuthSettings, StoreError> {
        let query = r"
            SELECT allow_register, unique_email, email_confirmation_required, default_role_type
            FROM auth_settings
            WHERE id = 1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to load auth settings")?;

        let mut settings = match row {
            Some(row) => AuthSettings {
                allow_register: row.get("allow_register"),
                unique_email: row.get("unique_email"),
                email_confirmation_required: row.get("email_confirmation_required"),
                default_role_type: row.get("default_role_type"),
                providers: BTreeMap::new(),
            },
            None => {
                warn!("auth_settings row missing, using defaults");
                return Ok(AuthSettings::default());
            }
        };

        let query = "SELECT name, enabled FROM auth_providers";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to load auth providers")?;

        for row in rows {
            let name: String = row.get("name");
            settings.providers.insert(
                Provider::from_name(&name).name().to_string(),
                ProviderSettings {
                    enabled: row.get("enabled"),
                },
            );
        }

        Ok(settings)
    }
}

/// Queues confirmation emails in `email_outbox` for the delivery worker.
#[derive(Clone, Debug)]
pub struct OutboxConfirmationSender {
    pool: PgPool,
}

impl OutboxConfirmationSender {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConfirmationSender for OutboxConfirmationSender {
    async fn send_confirmation(&self, user: &SanitizedUser) -> anyhow::Result<()> {
        let payload = serde_json::to_string(&json!({
            "userId": user.id,
            "username": user.username,
            "email": user.email,
        }))
        .context("failed to serialize confirmation payload")?;

        let query = r"
            INSERT INTO email_outbox
                (to_email, template, payload_json)
            VALUES ($1, 'confirm_email', $2::jsonb)
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(&user.email)
            .bind(payload)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to enqueue confirmation email")?;

        debug!(user_id = user.id, "Confirmation email queued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn unique_violation_is_detected_by_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23503"),
        }));
        assert!(!is_unique_violation(&err));

        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn user_columns_cover_the_record() {
        for column in [
            "id",
            "email",
            "username",
            "password_hash",
            "provider",
            "confirmed",
            "blocked",
            "role_id",
        ] {
            assert!(USER_COLUMNS.contains(column), "missing {column}");
        }
    }
}
