// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Mail dispatch backends.
//!
//! The backend is picked once from the `mail.mode` setting when the config
//! is loaded. Callers only see [`MailTransport::send`] succeed or fail.

use crate::message::MailMessage;
use async_trait::async_trait;
use chrono::Local;
use contact_form_common::config::{MailConfig, MailMode};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, AsyncSendmailTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Dispatch errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("smtp transport setup failed: {0}")]
    Setup(String),

    #[error("smtp delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("sendmail delivery failed: {0}")]
    Sendmail(#[from] lettre::transport::sendmail::Error),

    #[error("failed to write mail record: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that can hand off a composed message.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), DispatchError>;
}

/// The configured backend.
pub enum Mailer {
    File(FileMailer),
    Smtp(SmtpMailer),
    Sendmail(SendmailMailer),
}

impl Mailer {
    pub fn from_config(config: &MailConfig) -> Self {
        match config.mode {
            MailMode::File => Mailer::File(FileMailer::new(config.file_path.clone())),
            MailMode::Smtp => Mailer::Smtp(SmtpMailer::new(config)),
            MailMode::Sendmail => Mailer::Sendmail(SendmailMailer::new(config.sendmail_path.as_deref())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Mailer::File(_) => "file",
            Mailer::Smtp(_) => "smtp",
            Mailer::Sendmail(_) => "sendmail",
        }
    }
}

#[async_trait]
impl MailTransport for Mailer {
    async fn send(&self, message: &MailMessage) -> Result<(), DispatchError> {
        debug!(backend = self.kind(), recipients = message.to.len(), "Dispatching message");
        match self {
            Mailer::File(m) => m.send(message).await,
            Mailer::Smtp(m) => m.send(message).await,
            Mailer::Sendmail(m) => m.send(message).await,
        }
    }
}

/// Development backend: writes each message to a timestamped file.
#[derive(Debug, Clone)]
pub struct FileMailer {
    dir: PathBuf,
}

impl FileMailer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Record file for a message written now.
    pub fn record_path(&self) -> PathBuf {
        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        self.dir.join(format!("mailer_log_{stamp}.txt"))
    }
}

/// Record layout: body, blank line, `Headers:`, one header per line.
pub fn file_record(message: &MailMessage) -> String {
    format!("{}\n\nHeaders:\n{}\n", message.body, message.headers.join("\n"))
}

#[async_trait]
impl MailTransport for FileMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), DispatchError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.record_path();
        // same-second records share a file instead of overwriting each other
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(file_record(message).as_bytes()).await?;
        file.flush().await?;
        info!(path = %path.display(), "Message written to file");
        Ok(())
    }
}

/// SMTP relay backend.
pub struct SmtpMailer {
    transport: Result<AsyncSmtpTransport<Tokio1Executor>, String>,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Self {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.host.clone())
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if config.auth {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        let transport = if config.secure.requires_starttls() {
            TlsParameters::new(config.host.clone())
                .map(|params| builder.tls(Tls::Required(params)).build())
                .map_err(|e| e.to_string())
        } else {
            Ok(builder.build())
        };

        Self { transport }
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), DispatchError> {
        let transport = self
            .transport
            .as_ref()
            .map_err(|e| DispatchError::Setup(e.clone()))?;
        let email = build_email(message)?;
        transport.send(email).await?;
        Ok(())
    }
}

/// Local sendmail backend.
pub struct SendmailMailer {
    transport: AsyncSendmailTransport<Tokio1Executor>,
}

impl SendmailMailer {
    pub fn new(command: Option<&str>) -> Self {
        let transport = match command {
            Some(command) => AsyncSendmailTransport::<Tokio1Executor>::new_with_command(command),
            None => AsyncSendmailTransport::<Tokio1Executor>::new(),
        };
        Self { transport }
    }
}

#[async_trait]
impl MailTransport for SendmailMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), DispatchError> {
        let email = build_email(message)?;
        self.transport.send(email).await?;
        Ok(())
    }
}

fn parse_address(address: &str) -> Result<Address, DispatchError> {
    address
        .parse::<Address>()
        .map_err(|e| DispatchError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Convert a composed message into a `lettre` message.
pub fn build_email(message: &MailMessage) -> Result<Message, DispatchError> {
    let mut builder = Message::builder()
        .from(Mailbox::new(None, parse_address(&message.from)?))
        .subject(message.subject.clone())
        .header(ContentType::TEXT_PLAIN);

    for recipient in &message.to {
        let label = (!recipient.label.is_empty()).then(|| recipient.label.clone());
        builder = builder.to(Mailbox::new(label, parse_address(&recipient.address)?));
    }

    match parse_address(&message.reply_to) {
        Ok(address) => builder = builder.reply_to(Mailbox::new(None, address)),
        Err(e) => warn!(error = %e, "Skipping Reply-To"),
    }

    Ok(builder.body(message.body.clone())?)
}
