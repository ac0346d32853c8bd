// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact form validator.
//!
//! Every field is checked independently and every failing field is
//! reported:
//! - Name: required, letters/marks/apostrophe/hyphen/dot/space, 2+ chars
//! - Email: configured pattern or structural fallback
//! - Phone: normalized, checked when required or provided
//! - Message: required, minimum length, optional link blocking

use crate::rules::CompiledRules;
use crate::sanitize::sanitize_html;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Form fields, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Email,
    Phone,
    Message,
}

/// Raw submission as received from the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub message: String,
}

impl SubmissionRequest {
    /// Copy with surrounding whitespace removed from every field.
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            message: self.message.trim().to_string(),
        }
    }
}

/// Per-field errors; empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationResult {
    errors: BTreeMap<Field, String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn errors(&self) -> &BTreeMap<Field, String> {
        &self.errors
    }

    /// Copy with every message passed through the HTML sanitizer.
    pub fn sanitized(&self) -> Self {
        Self {
            errors: self
                .errors
                .iter()
                .map(|(field, message)| (*field, sanitize_html(message)))
                .collect(),
        }
    }

    fn set(&mut self, field: Field, message: Option<String>) {
        if let Some(message) = message {
            self.errors.insert(field, message);
        }
    }
}

/// Keep ASCII digits, plus a `+` only when it is the very first character.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .enumerate()
        .filter(|&(i, c)| c.is_ascii_digit() || (c == '+' && i == 0))
        .map(|(_, c)| c)
        .collect()
}

fn is_present(value: &str) -> bool {
    value.chars().any(|c| !c.is_whitespace())
}

/// Contact form validator.
#[derive(Debug, Clone)]
pub struct FormValidator {
    rules: CompiledRules,
}

impl FormValidator {
    /// Create a new validator over compiled rules.
    pub fn new(rules: CompiledRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &CompiledRules {
        &self.rules
    }

    /// Validate the name field.
    pub fn validate_name(&self, name: &str) -> Option<String> {
        let messages = &self.rules.messages;
        if !is_present(name) {
            Some(messages.name_required.clone())
        } else if !self.rules.name.test(name) {
            Some(messages.name_invalid.clone())
        } else {
            None
        }
    }

    /// Validate the email field.
    pub fn validate_email(&self, email: &str) -> Option<String> {
        if self.rules.email.test(email) {
            None
        } else {
            Some(self.rules.messages.email_invalid.clone())
        }
    }

    /// Validate the phone field. Blank phones pass unless required.
    pub fn validate_phone(&self, phone: &str) -> Option<String> {
        if !self.rules.require_phone && phone.is_empty() {
            return None;
        }
        if self.rules.phone.test(&normalize_phone(phone)) {
            None
        } else {
            Some(self.rules.messages.phone_invalid.clone())
        }
    }

    /// Validate the message field.
    ///
    /// A required or too-short error takes precedence; the link error is
    /// only reported when the message is otherwise acceptable.
    pub fn validate_message(&self, message: &str) -> Option<String> {
        let messages = &self.rules.messages;
        let min = self.rules.min_message_length;

        let mut error = if !is_present(message) {
            Some(messages.message_required.clone())
        } else if message.chars().count() < min.max(1) {
            Some(messages.too_short(min))
        } else {
            None
        };

        if self.rules.block_urls && !message.is_empty() && self.rules.url.test(message) {
            debug!("Link found in message");
            error.get_or_insert_with(|| messages.message_has_links.clone());
        }

        error
    }

    /// Validate a complete submission.
    pub fn validate(&self, request: &SubmissionRequest) -> ValidationResult {
        let request = request.trimmed();
        let mut result = ValidationResult::default();

        result.set(Field::Name, self.validate_name(&request.name));
        result.set(Field::Email, self.validate_email(&request.email));
        result.set(Field::Phone, self.validate_phone(&request.phone));
        result.set(Field::Message, self.validate_message(&request.message));

        debug!(invalid_fields = result.errors.len(), "Validated submission");
        result
    }
}

/// Validate `request` against `rules`.
pub fn validate(request: &SubmissionRequest, rules: &CompiledRules) -> ValidationResult {
    FormValidator::new(rules.clone()).validate(request)
}
