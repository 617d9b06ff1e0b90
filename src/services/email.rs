use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};

use crate::config::SmtpConfig;

/// Outbound delivery boundary for verification codes and reset links.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), anyhow::Error>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    mailer: SmtpTransport,
    from_address: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, anyhow::Error> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| anyhow::anyhow!(e.to_string()))?
            .credentials(creds)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "Mailer initialized");

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl MessageSender for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), anyhow::Error> {
        let email = Message::builder()
            .from(self.from_address.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body.to_string())?;

        // Send in the blocking pool; the SMTP transport is synchronous.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email)).await?;

        match result {
            Ok(_) => {
                tracing::info!(
                    to = %to,
                    subject = %subject,
                    "Email sent successfully"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e.to_string(),
                    to = %to,
                    "Failed to send email"
                );
                Err(anyhow::anyhow!(e.to_string()))
            }
        }
    }
}

/// A message the mock sender accepted.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mock sender for testing. Records every message and can be told to fail
/// like a down SMTP relay would.
#[derive(Default)]
pub struct MockMailer {
    sent: Mutex<Vec<SentMessage>>,
    fail: AtomicBool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MessageSender for MockMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), anyhow::Error> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("Mock mailer configured to fail"));
        }

        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMessage {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_records_sent_messages() {
        let mailer = MockMailer::new();
        tokio_test::block_on(mailer.send("alice@example.com", "Hello", "Body")).unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "alice@example.com");
        assert_eq!(sent[0].subject, "Hello");
    }

    #[test]
    fn mock_fails_on_demand() {
        let mailer = MockMailer::new();
        mailer.set_fail(true);
        assert!(tokio_test::block_on(mailer.send("a@b.co", "s", "b")).is_err());
        assert!(mailer.sent().is_empty());

        mailer.set_fail(false);
        assert!(tokio_test::block_on(mailer.send("a@b.co", "s", "b")).is_ok());
    }
}
