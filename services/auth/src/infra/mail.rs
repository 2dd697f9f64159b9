use crate::domain::repository::Mailer;
use crate::error::AuthServiceError;

/// Mail "transport" that writes outbound messages to the log. Stands in
/// until a real delivery backend is wired behind the [`Mailer`] trait.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AuthServiceError> {
        tracing::info!(to, subject, "outbound mail");
        tracing::debug!(body, "outbound mail body");
        Ok(())
    }
}
