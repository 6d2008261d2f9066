//! # Passage (Session & Token Authority)
//!
//! `passage` verifies user credentials or delegated identities and turns them into
//! a short-lived access token plus a long-lived, rotating refresh token.
//!
//! ## Token Model
//!
//! - **Access token:** signed JWT carrying the user id, valid for `--jwt-expires`
//!   (one hour by default). Sent back in the `jwt` field.
//! - **Refresh token:** signed JWT carrying the user id, signed with a *separate*
//!   secret and valid for `--refresh-token-expires` (14 days by default). It travels
//!   in an `HttpOnly`, `SameSite=Strict` cookie named `refreshToken` and in the
//!   response body.
//! - **Stateless:** nothing is persisted server-side. A refresh token stays valid
//!   until it expires or the refresh secret is rotated; every refresh issues a new
//!   one but does not revoke the old.
//!
//! ## Account Gate
//!
//! Login and refresh both re-check account state, so blocking a user takes effect
//! on their next refresh even while they hold an unexpired refresh token.
//!
//! Unknown identifiers and wrong passwords produce the same
//! `Invalid identifier or password` message to resist account enumeration.

pub mod api;
pub mod auth;
pub mod cli;
pub mod storage;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
