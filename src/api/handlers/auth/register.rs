use axum::{
    Json,
    extract::Extension,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{login::session_response, state::AuthState, types::RegisterRequest};
use crate::auth::{AuthError, RegistrationOutcome, session::SessionBody};

#[utoipa::path(
    post,
    path = "/api/auth/local/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created. Tokens are omitted while email confirmation is pending", body = SessionBody),
        (status = 400, description = "Registration rejected", body = crate::auth::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<Map<String, Value>>>,
) -> Result<Response, AuthError> {
    let settings = auth_state.settings().await?;
    let raw = payload.map(|Json(body)| body).unwrap_or_default();
    match auth_state.registration().register(raw, &settings).await? {
        RegistrationOutcome::Pending(pending) => Ok(Json(pending).into_response()),
        RegistrationOutcome::Active(session) => session_response(session),
    }
}
