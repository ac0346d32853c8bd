// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Mail composition.

use chrono::{DateTime, SecondsFormat, Utc};
use contact_form_common::config::{MailConfig, Recipient};
use contact_form_common::sanitize::sanitize_header;
use contact_form_common::validator::{normalize_phone, SubmissionRequest};

/// A fully composed message, ready for any backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: Vec<Recipient>,
    pub reply_to: String,
    pub subject: String,
    pub body: String,
    pub headers: Vec<String>,
}

impl MailMessage {
    /// `label <address>` pairs joined for a `To:` header.
    pub fn to_header(&self) -> String {
        self.to
            .iter()
            .map(|r| format!("{} <{}>", r.label, r.address))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Build the message for an accepted submission.
///
/// `request` is expected to be trimmed already. Header values pass through
/// [`sanitize_header`]; the body is plain text and is left as submitted.
pub fn compose(
    mail: &MailConfig,
    request: &SubmissionRequest,
    identifier: &str,
    at: DateTime<Utc>,
) -> MailMessage {
    let to: Vec<Recipient> = mail
        .to
        .iter()
        .map(|r| Recipient {
            address: sanitize_header(&r.address),
            label: sanitize_header(&r.label),
        })
        .collect();

    let body = [
        "You’ve received a new contact form submission:".to_string(),
        String::new(),
        format!("Name:    {}", request.name),
        format!("Email:   {}", request.email),
        format!("Phone:   {}", normalize_phone(&request.phone)),
        "Message:".to_string(),
        request.message.clone(),
        String::new(),
        format!("IP: {identifier}"),
        format!("Time: {}", at.to_rfc3339_opts(SecondsFormat::Secs, false)),
    ]
    .join("\n");

    let mut message = MailMessage {
        from: sanitize_header(&mail.from),
        to,
        reply_to: sanitize_header(&request.email),
        subject: sanitize_header(&mail.subject),
        body,
        headers: Vec::new(),
    };

    message.headers = vec![
        "MIME-Version: 1.0".to_string(),
        "Content-Type: text/plain; charset=UTF-8".to_string(),
        format!("From: {}", message.from),
        format!("To: {}", message.to_header()),
        format!("Reply-To: {}", message.reply_to),
    ];
    message
}
