use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::MailerConfig;

/// A rendered notification ready for the delivery provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail provider rejected the message: {0}")]
    Rejected(String),
    #[error("mail transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Outbound email gateway. Callers decide whether a failure is fatal;
/// the appointment path treats it as log-and-continue.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Mailer backed by the hosted email API.
pub struct HttpMailer {
    http: reqwest::Client,
    config: MailerConfig,
}

impl HttpMailer {
    pub fn new(config: MailerConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let payload = serde_json::json!({
            "from": self.config.sender,
            "to": message.to,
            "subject": message.subject,
            "text": message.body,
        });

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MailError::Rejected(response.status().to_string()));
        }

        Ok(())
    }
}

/// In-process mailer for tests and `--in-memory` runs.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        let mailer = Self::default();
        mailer.fail.store(true, Ordering::Relaxed);
        mailer
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(MailError::Rejected("simulated delivery failure".to_string()));
        }

        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .push(message);
        Ok(())
    }
}
