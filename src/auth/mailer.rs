//! Confirmation-email capability used by registration.
//!
//! Delivery is owned by the external email subsystem; implementations here either
//! log the request or enqueue it for that subsystem.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::model::SanitizedUser;

#[async_trait]
pub trait ConfirmationSender: Send + Sync {
    /// Ask for a confirmation email to be sent to `user`.
    async fn send_confirmation(&self, user: &SanitizedUser) -> Result<()>;
}

/// Local dev sender that logs the request instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogConfirmationSender;

#[async_trait]
impl ConfirmationSender for LogConfirmationSender {
    async fn send_confirmation(&self, user: &SanitizedUser) -> Result<()> {
        info!(
            user_id = user.id,
            email = %user.email,
            "confirmation email send stub"
        );
        Ok(())
    }
}
