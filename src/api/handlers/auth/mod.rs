//! Auth handlers.
//!
//! Handlers only translate HTTP into calls on `SessionIssuer` and
//! `RegistrationService`; every failure is an `AuthError` and renders as
//! `{"error":{"status","name","message"}}`.
//!
//! ## Refresh cookie
//!
//! Local logins, registrations without pending confirmation, and refreshes set
//! `refreshToken` as an `HttpOnly`, `SameSite=Strict` cookie scoped to the
//! frontend host. Logout always clears it, even when no cookie was sent.

mod cookies;
pub mod login;
pub mod me;
pub mod register;
mod state;
pub mod token;
pub mod types;

pub use login::{callback, login};
pub use me::me;
pub use register::register;
pub use state::AuthState;
pub use token::{logout, refresh};
