use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use backup_config::SmtpConfig;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::error::Error;

/// One outgoing report email, fully assembled before it reaches the mailer.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
    /// Log file attached on failed runs.
    pub attachment: Option<PathBuf>,
}

/// Trait for sending report emails.
///
/// Abstracts the SMTP transport so notification dispatch can be tested
/// without a mail server.
#[async_trait::async_trait]
pub trait MailerOps: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), Error>;
}

/// Default implementation delivering through an authenticated STARTTLS relay.
pub struct SmtpMailerOps {
    smtp: SmtpConfig,
}

impl SmtpMailerOps {
    pub fn new(smtp: SmtpConfig) -> Self {
        Self { smtp }
    }

    fn build_message(&self, message: &EmailMessage) -> Result<Message, Error> {
        let from = message
            .from
            .parse::<Mailbox>()
            .map_err(|e| Error::MailError(format!("Invalid sender address {}: {e}", message.from)))?;
        let mut builder = Message::builder().from(from).subject(message.subject.clone());
        for recipient in &message.to {
            let to = recipient.parse::<Mailbox>().map_err(|e| {
                Error::MailError(format!("Invalid recipient address {recipient}: {e}"))
            })?;
            builder = builder.to(to);
        }

        let html = SinglePart::html(message.html_body.clone());
        let body = match &message.attachment {
            Some(path) => {
                let bytes = std::fs::read(path).map_err(|e| {
                    Error::MailError(format!("Cannot read attachment {}: {e}", path.display()))
                })?;
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "backup.log".to_string());
                let attachment = Attachment::new(file_name).body(bytes, ContentType::TEXT_PLAIN);
                MultiPart::mixed().singlepart(html).singlepart(attachment)
            }
            None => MultiPart::mixed().singlepart(html),
        };

        builder
            .multipart(body)
            .map_err(|e| Error::MailError(e.to_string()))
    }
}

#[async_trait::async_trait]
impl MailerOps for SmtpMailerOps {
    async fn send(&self, message: &EmailMessage) -> Result<(), Error> {
        let email = self.build_message(message)?;
        let transport = SmtpTransport::starttls_relay(&self.smtp.server)
            .map_err(|e| Error::MailError(e.to_string()))?
            .port(self.smtp.port)
            .credentials(Credentials::new(
                self.smtp.username.clone(),
                self.smtp.password.clone(),
            ))
            .build();
        transport
            .send(&email)
            .map(|_| ())
            .map_err(|e| Error::MailError(e.to_string()))
    }
}

/// Mock implementation recording outgoing messages for tests.
#[derive(Clone, Default)]
pub struct MockMailerOps {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    fail_with: Arc<Mutex<Option<String>>>,
}

impl MockMailerOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail with the given message.
    pub fn fail_with(&self, error: impl Into<String>) {
        *self.fail_with.lock().unwrap() = Some(error.into());
    }

    /// Messages handed to `send`, in order. Failed sends are not recorded.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn total_sent(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl MailerOps for MockMailerOps {
    async fn send(&self, message: &EmailMessage) -> Result<(), Error> {
        if let Some(error) = self.fail_with.lock().unwrap().as_ref() {
            return Err(Error::MailError(error.clone()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
