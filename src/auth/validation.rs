//! Request-shape validation for login and registration bodies.

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::error::AuthError;

/// Fields a client may never set on its own account.
pub const SERVER_CONTROLLED_FIELDS: &[&str] = &[
    "id",
    "confirmed",
    "blocked",
    "confirmationToken",
    "resetPasswordToken",
    "provider",
    "role",
    "createdAt",
    "updatedAt",
    "createdBy",
    "updatedBy",
];

#[must_use]
pub fn is_email(input: &str) -> bool {
    Regex::new(
        r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#,
    )
    .is_ok_and(|regex| regex.is_match(input))
}

fn required(field: &str, value: Option<&str>) -> Result<String, AuthError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(AuthError::Validation(format!(
            "{field} is a required field"
        ))),
    }
}

/// Body of `POST /api/auth/local`.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub identifier: Option<String>,
    pub password: Option<String>,
}

/// Validated local credentials.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub identifier: String,
    pub password: String,
}

impl LoginRequest {
    /// # Errors
    /// `AuthError::Validation` naming the first missing field.
    pub fn validate(&self) -> Result<Credentials, AuthError> {
        Ok(Credentials {
            identifier: required("identifier", self.identifier.as_deref())?,
            password: required("password", self.password.as_deref())?,
        })
    }
}

/// Validated sign-up fields, email not yet folded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Drop server-controlled keys from a raw registration body.
#[must_use]
pub fn strip_server_fields(mut body: Map<String, Value>) -> Map<String, Value> {
    for field in SERVER_CONTROLLED_FIELDS {
        body.remove(*field);
    }
    body
}

/// # Errors
/// `AuthError::Validation` for a missing field or a malformed email.
pub fn validate_registration(body: &Map<String, Value>) -> Result<Registration, AuthError> {
    let field = |name: &str| body.get(name).and_then(Value::as_str);

    let email = required("email", field("email"))?;
    if !is_email(&email) {
        return Err(AuthError::Validation(
            "email must be a valid email".to_string(),
        ));
    }

    Ok(Registration {
        email,
        username: required("username", field("username"))?,
        password: required("password", field("password"))?,
    })
}
