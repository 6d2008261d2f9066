//! Refresh-token rotation and logout.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

use super::{
    cookies::{extract_refresh_cookie, set_cookie_value},
    state::AuthState,
    types::{LogoutResponse, RefreshRequest},
};
use crate::auth::{AuthError, session::RefreshBody};

#[utoipa::path(
    post,
    path = "/api/token/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens rotated; refresh cookie reset", body = RefreshBody),
        (status = 400, description = "Missing or invalid refresh token", body = crate::auth::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn refresh(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshRequest>>,
) -> Result<Response, AuthError> {
    let settings = auth_state.settings().await?;
    let cookie_token = extract_refresh_cookie(&headers);
    let body_token = payload.and_then(|Json(request)| request.refresh_token);

    let refreshed = auth_state
        .sessions()
        .refresh(&settings, cookie_token.as_deref(), body_token.as_deref())
        .await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(SET_COOKIE, set_cookie_value(&refreshed.cookie)?);
    Ok((response_headers, Json(refreshed.body)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Refresh cookie cleared", body = LogoutResponse)
    ),
    tag = "auth"
)]
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    match set_cookie_value(&auth_state.sessions().logout()) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build logout cookie: {err}"),
    }
    (
        headers,
        Json(LogoutResponse {
            message: "ok".to_string(),
        }),
    )
}
