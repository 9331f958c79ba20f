use crate::domain::errors::DomainError;
use crate::domain::ports::Mailer;

/// Writes outgoing mail to the log instead of delivering it.
pub struct LogMailer {
    sender: String,
}

impl LogMailer {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

impl Mailer for LogMailer {
    fn send_password_reset(&self, recipient: &str, reset_url: &str) -> Result<(), DomainError> {
        log::info!(
            "Mail from {} to {}: \"Password reset\" (link: {})",
            self.sender,
            recipient,
            reset_url
        );
        Ok(())
    }
}
