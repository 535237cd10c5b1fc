//! Outbound email delivery
//!
//! The report job only ever talks to the `Mailer` trait. `HttpMailer`
//! posts to a JSON mail API; `MockMailer` records messages for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::{Error, Result};

/// Interface for sending a single plain-text email
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Concrete mailer enum, mirroring the feed client shape
#[derive(Clone)]
pub enum MailClient {
    Http(HttpMailer),
    Mock(MockMailer),
}

impl MailClient {
    /// Build from environment variables; None disables report delivery
    pub fn from_env() -> Option<Self> {
        HttpMailer::from_env().map(MailClient::Http)
    }

    pub fn mock(mailer: MockMailer) -> Self {
        MailClient::Mock(mailer)
    }
}

#[async_trait]
impl Mailer for MailClient {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        match self {
            MailClient::Http(m) => m.send(to, subject, body).await,
            MailClient::Mock(m) => m.send(to, subject, body).await,
        }
    }
}

/// Mail API backend
///
/// Posts one message per call to `{host}/messages` with a bearer key.
pub struct HttpMailer {
    http_client: Client,
    base_url: String,
    api_key: String,
    from: String,
}

impl Clone for HttpMailer {
    fn clone(&self) -> Self {
        Self {
            http_client: Client::new(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            from: self.from.clone(),
        }
    }
}

#[derive(Serialize)]
struct OutboundMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(host: &str, api_key: &str, from: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: host.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }

    /// Read `GIGSENSE_MAIL_HOST`, `GIGSENSE_MAIL_KEY`, and
    /// `GIGSENSE_MAIL_FROM`; all three must be set
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("GIGSENSE_MAIL_HOST").ok()?;
        let api_key = std::env::var("GIGSENSE_MAIL_KEY").ok()?;
        let from = std::env::var("GIGSENSE_MAIL_FROM").ok()?;
        Some(Self::new(&host, &api_key, &from))
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let url = format!("{}/messages", self.base_url);
        let message = OutboundMessage {
            from: &self.from,
            to,
            subject,
            text: body,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Notify(format!(
                "mail API returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// A sent message captured by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
struct MockMailerState {
    sent: Vec<SentMail>,
    /// Recipients whose sends fail
    failures: Vec<String>,
}

/// Mock mailer for testing; records every send
#[derive(Clone, Default)]
pub struct MockMailer {
    state: Arc<Mutex<MockMailerState>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, MockMailerState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Make sends to this recipient fail
    pub fn fail_for(&self, to: &str) {
        self.locked().failures.push(to.to_string());
    }

    /// Everything sent so far, in order
    pub fn sent(&self) -> Vec<SentMail> {
        self.locked().sent.clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let mut state = self.locked();
        if state.failures.iter().any(|f| f == to) {
            return Err(Error::Notify(format!("delivery to {} refused", to)));
        }
        state.sent.push(SentMail {
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

    #[tokio::test]
    async fn test_mock_records_sends() {
        let mailer = MockMailer::new();
        mailer
            .send("worker@example.com", "Weekly summary", "You earned $770")
            .await
            .unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "worker@example.com");
        assert_eq!(sent[0].subject, "Weekly summary");
    }

    #[tokio::test]
    async fn test_mock_injected_failure() {
        let mailer = MockMailer::new();
        mailer.fail_for("broken@example.com");

        let err = mailer
            .send("broken@example.com", "s", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Notify(_)));

        // Other recipients still work
        mailer.send("fine@example.com", "s", "b").await.unwrap();
        assert_eq!(mailer.sent().len(), 1);
    }

    #[test]
    fn test_from_env_missing_vars() {
        std::env::remove_var("GIGSENSE_MAIL_HOST");
        assert!(HttpMailer::from_env().is_none());
    }
}
