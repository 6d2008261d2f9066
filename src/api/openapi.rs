#![allow(clippy::needless_for_each)]

use utoipa::OpenApi;

use super::handlers::{
    auth::{login, me, register, token, types},
    health,
};
use crate::auth::{
    error::{ErrorBody, ErrorDetail},
    model::SanitizedUser,
    registration::PendingBody,
    session::{RefreshBody, SessionBody},
    validation::LoginRequest,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        login::login,
        login::callback,
        register::register,
        token::refresh,
        token::logout,
        me::me
    ),
    components(schemas(
        health::Health,
        LoginRequest,
        types::RegisterRequest,
        types::RefreshRequest,
        types::LogoutResponse,
        SessionBody,
        PendingBody,
        RefreshBody,
        SanitizedUser,
        ErrorBody,
        ErrorDetail
    )),
    tags(
        (name = "auth", description = "Login, registration, token refresh and logout"),
        (name = "users", description = "Authenticated user"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
