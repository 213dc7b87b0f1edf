//! Email delivery abstraction.
//!
//! Handlers that need to notify a user (invitations, password resets) build an
//! `EmailMessage` and hand it to the shared `EmailSender`. The sender decides
//! how to deliver (SMTP, API, etc.) and returns `Ok`/`Err`; a rejected
//! delivery surfaces as an error on the calling route, except where the route
//! is intentionally opaque.
//!
//! The default sender for local dev is `LogEmailSender`, which logs and
//! returns `Ok(())`. Swapping in a real transport only requires another
//! `EmailSender` implementation wired up in the server action.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

/// Email delivery abstraction used by the handlers.
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error to mark it as failed.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Shared sender handle injected into the router as an `Extension`.
pub type Mailer = Arc<dyn EmailSender>;

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            subject = %message.subject,
            body = %message.body,
            "email send stub"
        );
        Ok(())
    }
}
