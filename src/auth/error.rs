//! Failure taxonomy for the auth core and its HTTP rendering.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use super::store::StoreError;

pub const INVALID_CREDENTIALS: &str = "Invalid identifier or password";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid identifier or password")]
    InvalidCredentials,
    #[error("This provider is disabled")]
    ProviderDisabled,
    #[error("Your account email is not confirmed")]
    AccountUnconfirmed,
    #[error("Your account has been blocked by an administrator")]
    AccountBlocked,
    #[error(
        "This user never set a local password, please login with the provider used during account creation"
    )]
    NoLocalPassword,
    #[error("Register action is currently disabled")]
    RegistrationDisabled,
    #[error("Email or Username are already taken")]
    IdentifierTaken,
    #[error("Impossible to find the default role")]
    RoleNotFound,
    #[error("Invalid token.")]
    InvalidToken,
    #[error("no Authorization")]
    MissingToken,
    #[error("{0}")]
    Application(String),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.into())
    }
}

impl AuthError {
    /// Stable machine-readable kind used in the response body.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::InvalidCredentials => "InvalidCredentials",
            Self::ProviderDisabled => "ProviderDisabled",
            Self::AccountUnconfirmed => "AccountUnconfirmed",
            Self::AccountBlocked => "AccountBlocked",
            Self::NoLocalPassword => "NoLocalPassword",
            Self::RegistrationDisabled => "RegistrationDisabled",
            Self::IdentifierTaken => "IdentifierTaken",
            Self::RoleNotFound => "RoleNotFound",
            Self::InvalidToken => "InvalidToken",
            Self::MissingToken => "MissingToken",
            Self::Application(_) => "ApplicationError",
            Self::Internal(_) => "InternalServerError",
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show a client. Internal causes are never exposed.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ErrorDetail {
    pub status: u16,
    pub name: String,
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref err) = self {
            error!("Auth request failed: {err:#}");
        }
        let status = self.status();
        let body = ErrorBody {
            error: ErrorDetail {
                status: status.as_u16(),
                name: self.name().to_string(),
                message: self.public_message(),
            },
        };
        (status, Json(body)).into_response()
    }
}
