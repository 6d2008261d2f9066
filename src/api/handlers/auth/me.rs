use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{cookies::extract_bearer_token, state::AuthState};
use crate::auth::{
    AuthError,
    error::{ErrorBody, ErrorDetail},
    model::SanitizedUser,
};

fn unauthorized(err: &AuthError) -> Response {
    let status = StatusCode::UNAUTHORIZED;
    let body = ErrorBody {
        error: ErrorDetail {
            status: status.as_u16(),
            name: "UnauthorizedError".to_string(),
            message: err.public_message(),
        },
    };
    (status, Json(body)).into_response()
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Current user", body = SanitizedUser),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn me(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    let Some(token) = extract_bearer_token(&headers) else {
        return unauthorized(&AuthError::MissingToken);
    };

    let result = match auth_state.settings().await {
        Ok(settings) => auth_state.sessions().authenticate(&settings, &token).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(user) => Json(user).into_response(),
        Err(err @ AuthError::Internal(_)) => err.into_response(),
        Err(err) => unauthorized(&err),
    }
}
