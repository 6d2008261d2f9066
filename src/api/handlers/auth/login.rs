//! Local and delegated login endpoints.

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{cookies::set_cookie_value, state::AuthState};
use crate::auth::{
    AuthError,
    bridge::CallbackQuery,
    model::Provider,
    session::{Session, SessionBody},
    validation::LoginRequest,
};

pub(super) fn session_response(session: Session) -> Result<Response, AuthError> {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = &session.cookie {
        headers.insert(SET_COOKIE, set_cookie_value(cookie)?);
    }
    Ok((headers, Json(session.body)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/auth/local",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated; refresh cookie set", body = SessionBody),
        (status = 400, description = "Login rejected", body = crate::auth::error::ErrorBody),
        (status = 500, description = "Internal error", body = crate::auth::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, AuthError> {
    let settings = auth_state.settings().await?;
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let session = auth_state
        .sessions()
        .login_local(&settings, &request)
        .await?;
    session_response(session)
}

#[utoipa::path(
    method(get, post),
    path = "/api/auth/{provider}/callback",
    params(
        ("provider" = String, Path, description = "Provider name, e.g. `github`")
    ),
    responses(
        (status = 200, description = "Authenticated through the provider", body = SessionBody),
        (status = 400, description = "Login rejected", body = crate::auth::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn callback(
    auth_state: Extension<Arc<AuthState>>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AuthError> {
    let settings = auth_state.settings().await?;
    let provider = Provider::from_name(&provider);
    let session = auth_state
        .sessions()
        .login(&provider, &settings, None, &query)
        .await?;
    session_response(session)
}
