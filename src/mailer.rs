//! Report delivery over SMTP.
//!
//! The transport is the blocking lettre client behind a small async
//! trait, so the report path can await a send without holding up the
//! runtime. Failures here are fatal for a report run and propagate to
//! the caller; the next scheduled run simply tries again.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("could not build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp failure: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("mail task failed: {0}")]
    Task(String),
}

/// Anything that can deliver one HTML report.
#[async_trait]
pub trait ReportMailer: Send + Sync {
    async fn send(&self, subject: &str, html_body: &str) -> Result<(), MailError>;
}

/// STARTTLS relay client with username/password auth.
#[derive(Clone)]
pub struct SmtpReportMailer {
    transport: SmtpTransport,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpReportMailer {
    pub fn from_config(config: &MailConfig) -> Result<SmtpReportMailer, MailError> {
        let transport = SmtpTransport::starttls_relay(&config.smtp_relay)?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(SmtpReportMailer {
            transport,
            from: config.username.parse()?,
            to: config.recipient.parse()?,
        })
    }
}

#[async_trait]
impl ReportMailer for SmtpReportMailer {
    async fn send(&self, subject: &str, html_body: &str) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())?;

        let transport = self.transport.clone();
        let sent = tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| MailError::Task(e.to_string()))?;
        sent?;
        log::info!("weekly report email sent to {}", self.to);
        Ok(())
    }
}
