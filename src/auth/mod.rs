//! Authentication core: tokens, credentials, account gating and session flows.
//!
//! Nothing here knows about HTTP transport beyond `AuthError`'s response
//! rendering; handlers in `crate::api` adapt requests onto `SessionIssuer` and
//! `RegistrationService`.

pub mod bridge;
pub mod config;
pub mod cookie;
pub mod error;
pub mod gate;
pub mod mailer;
pub mod model;
pub mod password;
pub mod registration;
pub mod session;
pub mod store;
pub mod token;
pub mod validation;

pub use config::{AuthConfig, DeploymentMode};
pub use error::AuthError;
pub use registration::{RegistrationOutcome, RegistrationService};
pub use session::{SessionIssuer, TokenIssuer};
